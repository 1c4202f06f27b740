//! Channel tensorization.
//!
//! Diagnostics often store one variable per channel (`ccbv1`, `ccbv2`, ...,
//! `ccbv40`). [`TensorizeChannels`] fuses such a family into one variable
//! with an extra leading axis enumerating the channels.
//!
//! The work is split in two phases:
//!
//! 1. [`discover`](TensorizeChannels::discover): select the variables whose
//!    name matches the pattern and put them in numeric-aware order
//! 2. [`fuse`](TensorizeChannels::fuse): stack them, label the new axis and
//!    drop the originals
//!
//! ```text
//! ccbv1 [time]  ─┐
//! ccbv2 [time]  ─┼──▶  ccbv [ccbv_channel, time]   ccbv_channel = ["ccbv1", "ccbv2", "ccbv10"]
//! ccbv10 [time] ─┘
//! ```

use ndarray::{ArrayViewD, Axis};
use regex::Regex;

use super::DatasetTransform;
use crate::error::{ConfigResult, ConfigurationError, NormalizeResult};
use crate::logs::log_warning_indent;
use crate::models::{ChunkHint, Coordinate, LabeledDataset, Variable};

/// Fuse numbered channel variables into one array.
#[derive(Debug, Clone)]
pub struct TensorizeChannels {
    stem: String,
    pattern: Regex,
    dim_name: String,
    assign_coords: bool,
}

impl TensorizeChannels {
    /// Channels named `<stem><digits>`, fused along `<stem>_channel`.
    pub fn new(stem: &str) -> ConfigResult<Self> {
        let pattern = format!("{}(\\d+)", regex::escape(stem));
        Ok(Self {
            stem: stem.to_string(),
            pattern: compile_pattern(&pattern)?,
            dim_name: format!("{}_channel", stem),
            assign_coords: true,
        })
    }

    /// Build from optional overrides, as found in pipeline definitions.
    pub fn from_parts(
        stem: &str,
        pattern: Option<&str>,
        dim_name: Option<&str>,
        assign_coords: bool,
    ) -> ConfigResult<Self> {
        let mut tensorizer = Self::new(stem)?.with_assign_coords(assign_coords);
        if let Some(pattern) = pattern {
            tensorizer = tensorizer.with_pattern(pattern)?;
        }
        if let Some(dim_name) = dim_name {
            tensorizer = tensorizer.with_dim_name(dim_name);
        }
        Ok(tensorizer)
    }

    /// Use a custom pattern. It must have exactly one capturing group.
    pub fn with_pattern(mut self, pattern: &str) -> ConfigResult<Self> {
        self.pattern = compile_pattern(pattern)?;
        Ok(self)
    }

    pub fn with_dim_name(mut self, dim_name: &str) -> Self {
        self.dim_name = dim_name.to_string();
        self
    }

    /// Whether the new axis gets a coordinate of the original variable names.
    pub fn with_assign_coords(mut self, assign_coords: bool) -> Self {
        self.assign_coords = assign_coords;
        self
    }

    pub fn stem(&self) -> &str {
        &self.stem
    }

    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    pub fn dim_name(&self) -> &str {
        &self.dim_name
    }

    /// Names of the matching variables, in channel order.
    pub fn discover(&self, dataset: &LabeledDataset) -> Vec<String> {
        let mut keyed: Vec<(Vec<Fragment>, String)> = dataset
            .variables()
            .map(|(name, _)| name)
            .filter(|name| self.pattern.is_match(name))
            .map(|name| (self.sort_key(name), name.clone()))
            .collect();
        keyed.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));
        keyed.into_iter().map(|(_, name)| name).collect()
    }

    /// Stack `channels` (in the given order) into the stem variable.
    pub fn fuse(&self, mut dataset: LabeledDataset, channels: &[String]) -> NormalizeResult<LabeledDataset> {
        let Some(first_name) = channels.first() else {
            log_warning_indent(
                format!("No variables match '{}', '{}' not created", self.pattern.as_str(), self.stem),
                2,
            );
            return Ok(dataset);
        };

        if dataset.contains(&self.stem) && !channels.contains(&self.stem) {
            return Err(ConfigurationError::StemExists(self.stem.clone()).into());
        }

        let (fused, coord) = {
            let first = channel(&dataset, first_name)?;
            if first.has_dim(&self.dim_name) {
                return Err(ConfigurationError::DimensionInUse {
                    stem: self.stem.clone(),
                    dim: self.dim_name.clone(),
                }
                .into());
            }
            if let Some(size) = dataset.size_of(&self.dim_name) {
                if size != channels.len() {
                    return Err(ConfigurationError::AxisSizeConflict {
                        axis: self.dim_name.clone(),
                        left: size,
                        right: channels.len(),
                    }
                    .into());
                }
            }

            let expected = first.sizes();
            let mut views: Vec<ArrayViewD<'_, f64>> = Vec::with_capacity(channels.len());
            for name in channels {
                let variable = channel(&dataset, name)?;
                let found = variable.sizes();
                if found != expected {
                    return Err(ConfigurationError::ShapeMismatch {
                        stem: self.stem.clone(),
                        variable: name.clone(),
                        expected,
                        found,
                    }
                    .into());
                }
                views.push(variable.data().view());
            }

            let stacked = ndarray::stack(Axis(0), &views).map_err(|_| ConfigurationError::ShapeMismatch {
                stem: self.stem.clone(),
                variable: first_name.clone(),
                expected: expected.clone(),
                found: expected.clone(),
            })?;

            let mut dims = vec![self.dim_name.clone()];
            dims.extend(first.dims().iter().cloned());
            let mut fused = Variable::new(dims, stacked)?;
            fused.attrs = first.attrs.clone();
            fused.chunks = ChunkHint::Auto;

            let coord = if self.assign_coords {
                let coord = Coordinate::labels(&self.dim_name, channels.to_vec());
                if let Some(existing) = dataset.coord(&self.dim_name) {
                    if !existing.same_content(&coord) {
                        return Err(ConfigurationError::CoordinateConflict(self.dim_name.clone()).into());
                    }
                }
                Some(coord)
            } else {
                None
            };
            (fused, coord)
        };

        for name in channels {
            dataset.remove_variable(name);
        }
        dataset.insert_variable(self.stem.clone(), fused)?;
        if let Some(coord) = coord {
            dataset.insert_coord(self.dim_name.clone(), coord)?;
        }
        Ok(dataset)
    }

    /// Split a name on the pattern, keeping the captured token, and turn
    /// all-digit fragments into integers.
    fn sort_key(&self, name: &str) -> Vec<Fragment> {
        let mut fragments = Vec::new();
        let mut last = 0;
        for caps in self.pattern.captures_iter(name) {
            let Some(whole) = caps.get(0) else {
                continue;
            };
            fragments.push(Fragment::parse(&name[last..whole.start()]));
            for group in caps.iter().skip(1).flatten() {
                fragments.push(Fragment::parse(group.as_str()));
            }
            last = whole.end();
        }
        fragments.push(Fragment::parse(&name[last..]));
        fragments
    }
}

impl DatasetTransform for TensorizeChannels {
    fn label(&self) -> String {
        format!("tensorize_channels({})", self.stem)
    }

    fn apply(&self, dataset: LabeledDataset) -> NormalizeResult<LabeledDataset> {
        let channels = self.discover(&dataset);
        self.fuse(dataset, &channels)
    }
}

fn compile_pattern(pattern: &str) -> ConfigResult<Regex> {
    let regex = Regex::new(pattern).map_err(|e| ConfigurationError::InvalidPattern {
        pattern: pattern.to_string(),
        message: e.to_string(),
    })?;
    // Group 0 is the whole match.
    if regex.captures_len() != 2 {
        return Err(ConfigurationError::InvalidPattern {
            pattern: pattern.to_string(),
            message: format!("expected exactly one capturing group, found {}", regex.captures_len() - 1),
        });
    }
    Ok(regex)
}

fn channel<'a>(dataset: &'a LabeledDataset, name: &str) -> NormalizeResult<&'a Variable> {
    dataset.variable(name).ok_or_else(|| {
        crate::error::DataShapeError::MissingVariable {
            dataset: dataset.name().unwrap_or("?").to_string(),
            variable: name.to_string(),
        }
        .into()
    })
}

/// One piece of a split variable name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum Fragment {
    Number(u64),
    Text(String),
}

impl Fragment {
    fn parse(s: &str) -> Self {
        if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(n) = s.parse() {
                return Fragment::Number(n);
            }
        }
        Fragment::Text(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channels(names: &[&str], len: usize) -> LabeledDataset {
        let mut ds = LabeledDataset::new("amb");
        for (i, name) in names.iter().enumerate() {
            let values = (0..len).map(|t| (i * 100 + t) as f64).collect();
            ds.insert_variable(*name, Variable::vector("time", values)).unwrap();
        }
        ds
    }

    #[test]
    fn test_defaults_from_stem() {
        let tensorizer = TensorizeChannels::new("fl.cc").unwrap();
        assert_eq!(tensorizer.stem(), "fl.cc");
        assert_eq!(tensorizer.pattern(), r"fl\.cc(\d+)");
        assert_eq!(tensorizer.dim_name(), "fl.cc_channel");
        assert!(tensorizer.discover(&channels(&["flxcc1"], 1)).is_empty());
    }

    #[test]
    fn test_numeric_order() {
        let ds = channels(&["x2", "x10", "x1"], 3);
        let tensorizer = TensorizeChannels::new("x").unwrap().with_pattern(r"x(\d+)").unwrap();
        assert_eq!(tensorizer.discover(&ds), vec!["x1", "x2", "x10"]);
    }

    #[test]
    fn test_fuse_layout_and_coords() {
        let ds = channels(&["ccbv2", "ccbv10", "ccbv1", "ip"], 4);
        let out = TensorizeChannels::new("ccbv").unwrap().apply(ds).unwrap();

        let fused = out.variable("ccbv").unwrap();
        assert_eq!(fused.dims(), &["ccbv_channel".to_string(), "time".to_string()]);
        assert_eq!(fused.shape(), &[3, 4]);
        assert_eq!(fused.chunks, ChunkHint::Auto);
        assert_eq!(
            out.coord("ccbv_channel"),
            Some(&Coordinate::labels("ccbv_channel", vec!["ccbv1", "ccbv2", "ccbv10"]))
        );
        assert_eq!(out.variable_names(), vec!["ccbv".to_string(), "ip".to_string()]);
    }

    #[test]
    fn test_round_trip_is_lossless() {
        let ds = channels(&["obr1", "obr2", "obr3", "obr11"], 5);
        let tensorizer = TensorizeChannels::new("obr").unwrap();
        let order = tensorizer.discover(&ds);
        let out = tensorizer.apply(ds.clone()).unwrap();

        let fused = out.variable("obr").unwrap();
        for (i, name) in order.iter().enumerate() {
            let slice: Vec<f64> = fused.data().index_axis(Axis(0), i).iter().copied().collect();
            assert_eq!(slice, ds.variable(name).unwrap().values());
        }
    }

    #[test]
    fn test_custom_pattern_and_dim() {
        let ds = channels(&["equil_s_seg2at", "equil_s_seg1at", "equil_s_seg1"], 2);
        let out = TensorizeChannels::from_parts(
            "equil_s_seg_at",
            Some(r"equil_s_seg(\d+)at$"),
            Some("equil_seg_channel"),
            false,
        )
        .unwrap()
        .apply(ds)
        .unwrap();

        let fused = out.variable("equil_s_seg_at").unwrap();
        assert_eq!(fused.shape(), &[2, 2]);
        assert_eq!(fused.values(), vec![100.0, 101.0, 0.0, 1.0]);
        assert!(out.coord("equil_seg_channel").is_none());
        assert!(out.contains("equil_s_seg1"));
    }

    #[test]
    fn test_zero_matches_is_noop() {
        let ds = channels(&["ip"], 2);
        let out = TensorizeChannels::new("ccbv").unwrap().apply(ds.clone()).unwrap();
        assert_eq!(out, ds);
    }

    #[test]
    fn test_shape_mismatch() {
        let mut ds = channels(&["fl_p1"], 3);
        ds.insert_variable("fl_p2", Variable::vector("r", vec![1.0, 2.0])).unwrap();
        let err = TensorizeChannels::new("fl_p").unwrap().apply(ds).unwrap_err();
        assert!(err.to_string().contains("fl_p2"));
    }

    #[test]
    fn test_pattern_needs_one_group() {
        assert!(TensorizeChannels::new("x").unwrap().with_pattern(r"x\d+").is_err());
        assert!(TensorizeChannels::new("x").unwrap().with_pattern(r"(x)(\d+)").is_err());
        assert!(TensorizeChannels::new("x").unwrap().with_pattern(r"x(\d+").is_err());
    }

    #[test]
    fn test_shared_axis_across_stems() {
        let ds = channels(&["ai_cpu1_ccbv1", "ai_cpu1_ccbv2", "ai_cpu2_ccbv1", "ai_cpu2_ccbv2"], 2);
        let cpu1 = TensorizeChannels::from_parts("ai_cpu1_ccbv", None, Some("ai_ccbv_channel"), false).unwrap();
        let cpu2 = TensorizeChannels::from_parts("ai_cpu2_ccbv", None, Some("ai_ccbv_channel"), false).unwrap();

        let out = cpu2.apply(cpu1.apply(ds).unwrap()).unwrap();
        assert_eq!(out.size_of("ai_ccbv_channel"), Some(2));
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn test_existing_stem_rejected() {
        let ds = channels(&["mid", "mid1", "mid2"], 2);
        let err = TensorizeChannels::new("mid").unwrap().apply(ds).unwrap_err();
        assert!(matches!(
            err,
            crate::error::NormalizeError::Configuration(ConfigurationError::StemExists(_))
        ));
    }
}
