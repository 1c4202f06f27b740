//! Built-in pipeline table, one definition per instrument source.

use crate::transform::dsl::{DatasetOp, PipelineDefinition, StepDef};

/// Sources that only need standardization and a merge.
const PLAIN_SOURCES: &[&str] = &[
    "adg", "ahx", "aim", "air", "ait", "ama", "amc", "amh", "ams", "anb", "ane", "ant", "anu", "arp",
    "asb", "ayc", "aye", "esx",
];

/// Sources whose axes must be renamed first.
const RENAMED_SOURCES: &[&str] = &["ada", "aga", "aoe", "xpc"];

/// Sources whose axes are renamed and then pruned of all-zero axes.
const RENAMED_PRUNED_SOURCES: &[&str] = &["abm", "esm"];

/// Bookkeeping entries of `efm` that carry no signal.
const EFM_DROPPED: &[&str] = &["fcoil_n", "fcoil_segs_n", "limitern", "magpr_n", "silop_n", "shot_number"];

const AMB_CHANNELS: &[&str] = &["ccbv", "obr", "obv", "fl_cc", "fl_p"];

const AMM_CHANNELS: &[&str] = &["incon", "mid", "ring", "rodgr", "vertw", "lhorw", "uhorw"];

/// Per-CPU analogue input groups of `xdc`.
const XDC_AI_GROUPS: &[&str] = &[
    "ccbv", "flcc", "incon", "lhorw", "mid", "obr", "obv", "ring", "rodgr", "uhorw", "vertw",
];

const XDC_AI_CPUS: usize = 4;

/// `(stem, dim_name)` of the raw analogue input groups of `xdc`.
const XDC_AI_RAW: &[(&str, &str)] = &[
    ("ai_raw_ccbv", "ai_ccbv"),
    ("ai_raw_flcc", "ai_flcc_channel"),
    ("ai_raw_obv", "ai_obv_channel"),
    ("ai_raw_obr", "ai_obr_channel"),
];

/// `(stem, regex)` of the equilibrium segment groups of `xdc`; all share one axis.
const XDC_EQUIL: &[(&str, Option<&str>)] = &[
    ("equil_s_seg", Some(r"equil_s_seg(\d+)$")),
    ("equil_s_seg_at", Some(r"equil_s_seg(\d+)at$")),
    ("equil_s_seg_rt", Some(r"equil_s_seg(\d+)rt$")),
    ("equil_s_seg_zt", Some(r"equil_s_seg(\d+)zt$")),
    ("equil_s_segb", None),
    ("equil_t_seg", Some(r"equil_t_seg(\d+)$")),
    ("equil_t_seg_u", Some(r"equil_t_seg(\d+)u$")),
];

const XDC_EQUIL_DIM: &str = "equil_seg_channel";

/// `(stem, regex)` of the isoflux groups of `xdc`.
const XDC_ISOFLUX: &[(&str, Option<&str>)] = &[
    ("isoflux_e_seg", None),
    ("isoflux_t_rpsh_n", Some(r"isoflux_t_rpsh(\d+)n")),
    ("isoflux_t_rpsh_p", Some(r"isoflux_t_rpsh(\d+)p")),
    ("isoflux_t_seg", Some(r"isoflux_t_seg(\d+)$")),
    ("isoflux_t_seg_gd", Some(r"isoflux_t_seg(\d+)gd$")),
    ("isoflux_t_seg_gi", Some(r"isoflux_t_seg(\d+)gi$")),
    ("isoflux_t_seg_gp", Some(r"isoflux_t_seg(\d+)gp$")),
    ("isoflux_t_seg_td", Some(r"isoflux_t_seg(\d+)td$")),
    ("isoflux_t_seg_ti", Some(r"isoflux_t_seg(\d+)ti$")),
    ("isoflux_t_seg_tp", Some(r"isoflux_t_seg(\d+)tp$")),
    ("isoflux_t_seg_u", Some(r"isoflux_t_seg(\d+)u$")),
    ("isoflux_t_zpsh_n", Some(r"isoflux_t_zpsh(\d+)n")),
    ("isoflux_t_zpsh_p", Some(r"isoflux_t_zpsh(\d+)p")),
];

/// `(stem, regex)` of the soft X-ray camera groups of `xsx`.
const XSX_CAMERAS: &[(&str, &str)] = &[
    ("hcam_l", r"hcam_l_(\d+)"),
    ("hcam_u", r"hcam_u_(\d+)"),
    ("tcam", r"tcam_(\d+)"),
];

/// Every built-in definition, sorted by source name.
pub fn definitions() -> Vec<PipelineDefinition> {
    let mut definitions: Vec<PipelineDefinition> = PLAIN_SOURCES.iter().map(|source| standard(source)).collect();

    definitions.extend(RENAMED_SOURCES.iter().map(|source| {
        PipelineDefinition::new(source)
            .map(DatasetOp::RenameDimensions)
            .map(DatasetOp::standardize(source))
            .merge()
    }));
    definitions.extend(RENAMED_PRUNED_SOURCES.iter().map(|source| renamed_pruned(PipelineDefinition::new(source))));

    definitions.push(
        PipelineDefinition::new("alp")
            .map(DatasetOp::DropZeroDimensions)
            .map(DatasetOp::RenameDimensions)
            .map(DatasetOp::standardize("alp"))
            .merge(),
    );
    definitions.push(standard("amb").tensorize(AMB_CHANNELS.iter().copied()));
    definitions.push(standard("amm").tensorize(AMM_CHANNELS.iter().copied()));
    definitions.push(standard("asm").tensorize(["sad_m"]));
    definitions.push(
        PipelineDefinition::new("asx")
            .with_description("time points are the payload")
            .map(DatasetOp::TimeAsData)
            .map(DatasetOp::standardize("asx"))
            .merge(),
    );
    definitions.push(renamed_pruned(
        PipelineDefinition::new("efm").step(StepDef::DropDatasets {
            keys: EFM_DROPPED.iter().map(|k| k.to_string()).collect(),
        }),
    ));
    definitions.push(xdc());
    definitions.push(XSX_CAMERAS.iter().fold(standard("xsx"), |definition, (stem, regex)| {
        definition.apply(tensorize(stem, Some(*regex), None, true))
    }));

    definitions.sort_by(|a, b| a.source.cmp(&b.source));
    definitions
}

/// Standardize every signal, then merge.
fn standard(source: &str) -> PipelineDefinition {
    PipelineDefinition::new(source)
        .map(DatasetOp::standardize(source))
        .merge()
}

/// Rename, prune zero axes, standardize, merge.
fn renamed_pruned(definition: PipelineDefinition) -> PipelineDefinition {
    let source = definition.source.clone();
    definition
        .map(DatasetOp::RenameDimensions)
        .map(DatasetOp::DropZeroDimensions)
        .map(DatasetOp::standardize(&source))
        .merge()
}

fn xdc() -> PipelineDefinition {
    let mut definition = standard("xdc");

    for cpu in 1..=XDC_AI_CPUS {
        for group in XDC_AI_GROUPS {
            let stem = format!("ai_cpu{}_{}", cpu, group);
            let dim = format!("ai_{}_channel", group);
            definition = definition.apply(tensorize(&stem, None, Some(&dim), false));
        }
    }
    for (stem, dim) in XDC_AI_RAW {
        definition = definition.apply(tensorize(stem, None, Some(*dim), false));
    }
    for (stem, regex) in XDC_EQUIL {
        definition = definition.apply(tensorize(stem, *regex, Some(XDC_EQUIL_DIM), false));
    }
    for (stem, regex) in XDC_ISOFLUX {
        definition = definition.apply(tensorize(stem, *regex, None, true));
    }
    definition
}

fn tensorize(stem: &str, regex: Option<&str>, dim_name: Option<&str>, assign_coords: bool) -> DatasetOp {
    DatasetOp::TensorizeChannels {
        stem: stem.to_string(),
        regex: regex.map(str::to_string),
        dim_name: dim_name.map(str::to_string),
        assign_coords,
    }
}
