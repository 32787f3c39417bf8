//! Post-decode structural checks. Everything here is advisory: issues are
//! collected, never raised, and an issue-free file is not implied to be
//! renderable.

use ahash::AHashSet;
use itertools::Itertools;

use crate::binary::chunks::cel::CelContent;
use crate::binary::color_depth::ColorDepth;
use crate::loader::AsepriteFile;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum IssueCode {
    NonPositiveDimensions,
    UnsupportedColorDepth,
    FrameCountMismatch,
    CelLayerOutOfRange,
    LinkedCelTargetOutOfRange,
    LinkedCelForwardReference,
    MissingPalette,
    TagRangeInvalid,
    SliceKeyOutOfRange,
    SliceKeyEmpty,
    DuplicateTilesetId,
    ChildLevelSkip,
}

/// Where an issue was found, as indices into the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Location {
    pub frame: Option<usize>,
    pub layer: Option<usize>,
    pub index: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    pub severity: Severity,
    pub code: IssueCode,
    pub message: String,
    pub location: Location,
}

impl Issue {
    fn new(severity: Severity, code: IssueCode, message: String) -> Self {
        Issue {
            severity,
            code,
            message,
            location: Location::default(),
        }
    }

    fn at(mut self, location: Location) -> Self {
        self.location = location;
        self
    }
}

pub fn validate(file: &AsepriteFile<'_>) -> Vec<Issue> {
    let mut issues = Vec::new();

    if file.header.width == 0 || file.header.height == 0 {
        issues.push(Issue::new(
            Severity::Error,
            IssueCode::NonPositiveDimensions,
            format!(
                "sprite dimensions {}x{} must be positive",
                file.header.width, file.header.height
            ),
        ));
    }
    if let ColorDepth::Unknown(depth) = file.header.color_depth {
        issues.push(Issue::new(
            Severity::Error,
            IssueCode::UnsupportedColorDepth,
            format!("color depth {depth} is not 8, 16 or 32"),
        ));
    }
    if file.header.frame_count as usize != file.frames.len() {
        issues.push(Issue::new(
            Severity::Warning,
            IssueCode::FrameCountMismatch,
            format!(
                "header declares {} frames, file has {}",
                file.header.frame_count,
                file.frames.len()
            ),
        ));
    }
    if file.header.color_depth == ColorDepth::Indexed
        && file.palette.as_ref().map_or(true, |palette| palette.is_empty())
    {
        issues.push(Issue::new(
            Severity::Error,
            IssueCode::MissingPalette,
            "indexed color depth requires a palette".to_owned(),
        ));
    }

    check_cels(file, &mut issues);
    check_tags(file, &mut issues);
    check_slices(file, &mut issues);
    check_tilesets(file, &mut issues);
    check_child_levels(file, &mut issues);

    issues
}

fn check_cels(file: &AsepriteFile<'_>, issues: &mut Vec<Issue>) {
    for (frame_index, frame) in file.frames.iter().enumerate() {
        for cel in &frame.cels {
            let layer = cel.layer_index();
            let location = Location {
                frame: Some(frame_index),
                layer: Some(layer),
                index: None,
            };
            if layer >= file.layers.len() {
                issues.push(
                    Issue::new(
                        Severity::Error,
                        IssueCode::CelLayerOutOfRange,
                        format!(
                            "cel in frame {frame_index} references layer {layer} of {}",
                            file.layers.len()
                        ),
                    )
                    .at(location),
                );
            }
            if let CelContent::Linked { frame_position } = cel.chunk.content {
                let target = frame_position as usize;
                if target >= file.frames.len() {
                    issues.push(
                        Issue::new(
                            Severity::Error,
                            IssueCode::LinkedCelTargetOutOfRange,
                            format!(
                                "linked cel in frame {frame_index} targets frame {target} of {}",
                                file.frames.len()
                            ),
                        )
                        .at(location),
                    );
                } else if target >= frame_index {
                    issues.push(
                        Issue::new(
                            Severity::Warning,
                            IssueCode::LinkedCelForwardReference,
                            format!(
                                "linked cel in frame {frame_index} targets frame {target}, which is not earlier"
                            ),
                        )
                        .at(location),
                    );
                }
            }
        }
    }
}

fn check_tags(file: &AsepriteFile<'_>, issues: &mut Vec<Issue>) {
    let frame_count = file.frames.len();
    for (index, tag) in file.tags.iter().enumerate() {
        let from = tag.chunk.from_frame as usize;
        let to = tag.chunk.to_frame as usize;
        if from > to || to >= frame_count {
            issues.push(
                Issue::new(
                    Severity::Error,
                    IssueCode::TagRangeInvalid,
                    format!(
                        "tag \"{}\" spans frames {from}..={to} of {frame_count}",
                        tag.name()
                    ),
                )
                .at(Location {
                    index: Some(index),
                    ..Location::default()
                }),
            );
        }
    }
}

fn check_slices(file: &AsepriteFile<'_>, issues: &mut Vec<Issue>) {
    let frame_count = file.frames.len();
    for (index, slice) in file.slices.iter().enumerate() {
        let location = Location {
            index: Some(index),
            ..Location::default()
        };
        for key in &slice.chunk.keys {
            if key.frame as usize >= frame_count {
                issues.push(
                    Issue::new(
                        Severity::Warning,
                        IssueCode::SliceKeyOutOfRange,
                        format!(
                            "slice \"{}\" has a key at frame {} of {frame_count}",
                            slice.name(),
                            key.frame
                        ),
                    )
                    .at(location),
                );
            }
            if key.width == 0 || key.height == 0 {
                issues.push(
                    Issue::new(
                        Severity::Warning,
                        IssueCode::SliceKeyEmpty,
                        format!(
                            "slice \"{}\" has an empty key at frame {}",
                            slice.name(),
                            key.frame
                        ),
                    )
                    .at(location),
                );
            }
        }
    }
}

fn check_tilesets(file: &AsepriteFile<'_>, issues: &mut Vec<Issue>) {
    let duplicates: AHashSet<u32> = file
        .tilesets
        .iter()
        .map(|tileset| tileset.chunk.id)
        .duplicates()
        .collect();
    for id in duplicates {
        issues.push(Issue::new(
            Severity::Error,
            IssueCode::DuplicateTilesetId,
            format!("tileset id {id} is used more than once"),
        ));
    }
}

/// A layer may sit at most one level deeper than the deepest layer seen so
/// far; a jump of two or more has no parent to attach to.
fn check_child_levels(file: &AsepriteFile<'_>, issues: &mut Vec<Issue>) {
    let mut max_level: u16 = 0;
    for (index, layer) in file.layers.iter().enumerate() {
        let level = layer.chunk.child_level;
        if level > max_level + 1 {
            issues.push(
                Issue::new(
                    Severity::Warning,
                    IssueCode::ChildLevelSkip,
                    format!(
                        "layer \"{}\" jumps to child level {level} past {max_level}",
                        layer.name()
                    ),
                )
                .at(Location {
                    layer: Some(index),
                    ..Location::default()
                }),
            );
        }
        max_level = max_level.max(level);
    }
}

#[cfg(test)]
mod tests {
    use std::borrow::Cow;

    use super::*;
    use crate::binary::blend_mode::BlendMode;
    use crate::binary::chunks::cel::CelChunk;
    use crate::binary::chunks::layer::{LayerChunk, LayerFlags, LayerType};
    use crate::binary::chunks::user_data::UserDataChunk;
    use crate::binary::header::Header;
    use crate::wrappers::{Cel, Frame, Layer};

    fn base_file() -> AsepriteFile<'static> {
        let mut header = Header::new(16, 16, ColorDepth::Rgba);
        header.frame_count = 1;
        AsepriteFile {
            header,
            palette: None,
            color_profile: None,
            external_files: Vec::new(),
            layers: vec![Layer {
                chunk: LayerChunk {
                    flags: LayerFlags::VISIBLE,
                    layer_type: LayerType::Normal,
                    child_level: 0,
                    default_width: 0,
                    default_height: 0,
                    blend_mode: BlendMode::Normal,
                    opacity: 255,
                    name: Cow::Borrowed("Layer 1"),
                    tileset_index: None,
                },
                user_data: UserDataChunk::default(),
            }],
            frames: vec![Frame {
                duration: 100,
                cels: Vec::new(),
                chunks: None,
            }],
            tags: Vec::new(),
            slices: Vec::new(),
            tilesets: Vec::new(),
            sprite_user_data: None,
            unknown_chunks: Vec::new(),
        }
    }

    #[test]
    fn clean_file_has_no_issues() {
        assert!(validate(&base_file()).is_empty());
    }

    #[test]
    fn out_of_range_cel_layer_is_an_error() {
        let mut file = base_file();
        file.frames[0].cels.push(Cel::new(CelChunk {
            layer_index: 7,
            x: 0,
            y: 0,
            opacity: 255,
            z_index: 0,
            content: crate::binary::chunks::cel::CelContent::Linked { frame_position: 0 },
        }));
        let issues = validate(&file);
        assert!(issues
            .iter()
            .any(|issue| issue.code == IssueCode::CelLayerOutOfRange
                && issue.severity == Severity::Error));
        // The linked target is frame 0 from frame 0: not earlier.
        assert!(issues
            .iter()
            .any(|issue| issue.code == IssueCode::LinkedCelForwardReference));
    }

    #[test]
    fn indexed_without_palette_is_an_error() {
        let mut file = base_file();
        file.header.color_depth = ColorDepth::Indexed;
        assert!(validate(&file)
            .iter()
            .any(|issue| issue.code == IssueCode::MissingPalette));
    }

    #[test]
    fn child_level_jump_is_flagged() {
        let mut file = base_file();
        let mut deep = file.layers[0].clone();
        deep.chunk.child_level = 2;
        file.layers.push(deep);
        assert!(validate(&file)
            .iter()
            .any(|issue| issue.code == IssueCode::ChildLevelSkip));
    }
}
