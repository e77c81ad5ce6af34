//! Line-oriented command scripts for headless sessions.
//!
//! One command per line; `#` starts a comment. Coordinates are screen pixels.
//! A command that fails to parse or dispatch is logged and skipped.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::controller::{Outcome, SessionController};
use crate::format::LabelMode;
use crate::message::Message;
use crate::model::Polarity;
use crate::view_transform::ZoomDirection;

/// A line that could not be turned into a message.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScriptError {
    #[error("unknown command '{command}'")]
    UnknownCommand { command: String },

    #[error("'{command}' expects {expected}")]
    MissingArgument {
        command: String,
        expected: &'static str,
    },

    #[error("'{token}' is not a number")]
    InvalidNumber { token: String },

    #[error("{message}")]
    InvalidArgument { message: String },
}

/// Totals for one script run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ScriptSummary {
    /// Commands dispatched successfully
    pub executed: usize,
    /// Commands rejected by the parser or the controller
    pub failed: usize,
    /// Files written by `export` and `crop-all` commands
    pub exported_images: usize,
    /// Annotations loaded by `import` commands
    pub imported_annotations: usize,
}

fn number<T: FromStr>(token: &str) -> Result<T, ScriptError> {
    token.parse().map_err(|_| ScriptError::InvalidNumber {
        token: token.to_string(),
    })
}

fn pair<T: FromStr>(
    command: &str,
    args: &[&str],
    expected: &'static str,
) -> Result<(T, T), ScriptError> {
    match args {
        [a, b, ..] => Ok((number(a)?, number(b)?)),
        _ => Err(ScriptError::MissingArgument {
            command: command.to_string(),
            expected,
        }),
    }
}

fn first<'a>(command: &str, args: &[&'a str], expected: &'static str) -> Result<&'a str, ScriptError> {
    args.first().copied().ok_or_else(|| ScriptError::MissingArgument {
        command: command.to_string(),
        expected,
    })
}

/// Parse one script line. Blank lines and comments give `Ok(None)`.
///
/// Relative paths are resolved against `base`.
pub fn parse_line(line: &str, base: &Path) -> Result<Option<Message>, ScriptError> {
    let line = match line.split_once('#') {
        Some((code, _)) => code,
        None => line,
    }
    .trim();
    let Some((command, rest)) = line
        .split_once(char::is_whitespace)
        .map(|(c, r)| (c, r.trim()))
        .or_else(|| (!line.is_empty()).then_some((line, "")))
    else {
        return Ok(None);
    };
    let args: Vec<&str> = rest.split_whitespace().collect();
    let path = |p: &str| -> PathBuf {
        let p = Path::new(p);
        if p.is_absolute() { p.to_path_buf() } else { base.join(p) }
    };

    let message = match command {
        "canvas" => {
            let (width, height) = pair(command, &args, "WIDTH HEIGHT")?;
            Message::Resize { width, height }
        }
        "open" => Message::SwitchImage(path(first(command, &args, "PATH")?)),
        "next" => Message::NextImage,
        "prev" => Message::PrevImage,
        "click" | "negative" => {
            let (x, y) = pair(command, &args, "X Y")?;
            let polarity = if command == "click" {
                Polarity::Positive
            } else {
                Polarity::Negative
            };
            Message::AddPoint { x, y, polarity }
        }
        "move" => {
            let (x, y) = pair(command, &args, "X Y")?;
            Message::PointerMoved { x, y }
        }
        "rclick" => {
            let (x, y) = pair(command, &args, "X Y")?;
            Message::SecondaryClick { x, y }
        }
        "undo-point" => Message::RemovePoint,
        "segment" => Message::Segment,
        "commit" => {
            if rest.is_empty() {
                return Err(ScriptError::MissingArgument {
                    command: command.to_string(),
                    expected: "a class name",
                });
            }
            Message::Commit {
                class_name: rest.to_string(),
            }
        }
        "remove" => Message::RemoveAnnotation(args.first().map(|t| number(t)).transpose()?),
        "zoom" => {
            let direction = match first(command, &args, "in|out X Y")? {
                "in" => ZoomDirection::In,
                "out" => ZoomDirection::Out,
                other => {
                    return Err(ScriptError::InvalidArgument {
                        message: format!("zoom direction must be 'in' or 'out', got '{}'", other),
                    });
                }
            };
            let (x, y) = pair(command, &args[1..], "in|out X Y")?;
            Message::Zoom { x, y, direction }
        }
        "pan" => {
            let (dx, dy) = pair(command, &args, "DX DY")?;
            Message::Pan { dx, dy }
        }
        "reset" => Message::Reset,
        "reset-session" => Message::ResetSession,
        "rename" => match args.as_slice() {
            [old, new, ..] => Message::RenameClass {
                old: old.to_string(),
                new: new.to_string(),
            },
            _ => {
                return Err(ScriptError::MissingArgument {
                    command: command.to_string(),
                    expected: "OLD NEW",
                });
            }
        },
        "crop" => match args.as_slice() {
            [x0, y0, x1, y1, ..] => Message::SetCrop {
                x0: number(x0)?,
                y0: number(y0)?,
                x1: number(x1)?,
                y1: number(y1)?,
            },
            _ => {
                return Err(ScriptError::MissingArgument {
                    command: command.to_string(),
                    expected: "X0 Y0 X1 Y1",
                });
            }
        },
        "crop-clear" => Message::ClearCrop,
        "crop-lock" => Message::ToggleCropLock,
        "crop-all" => Message::CropAll {
            dir: path(first(command, &args, "DIR")?),
        },
        "crop-save" => Message::SaveCrop {
            dir: path(first(command, &args, "DIR")?),
        },
        "crop-load" => Message::LoadCrop {
            dir: path(first(command, &args, "DIR")?),
        },
        "undo" => Message::Undo,
        "redo" => Message::Redo,
        "export" => {
            let dir = path(first(command, &args, "DIR [segmentation|detection]")?);
            let mode = args
                .get(1)
                .map(|m| LabelMode::from_str(m))
                .transpose()
                .map_err(|message| ScriptError::InvalidArgument { message })?;
            Message::Export { dir, mode }
        }
        "import" => Message::Import {
            dir: path(first(command, &args, "DIR")?),
        },
        other => {
            return Err(ScriptError::UnknownCommand {
                command: other.to_string(),
            });
        }
    };
    Ok(Some(message))
}

/// Run every line of `script` against the controller.
pub fn run_script(controller: &mut SessionController, script: &str, base: &Path) -> ScriptSummary {
    let mut summary = ScriptSummary::default();
    for (index, line) in script.lines().enumerate() {
        let line_no = index + 1;
        let message = match parse_line(line, base) {
            Ok(Some(message)) => message,
            Ok(None) => continue,
            Err(e) => {
                log::error!("line {}: {}", line_no, e);
                summary.failed += 1;
                continue;
            }
        };
        match controller.dispatch(message) {
            Ok(outcome) => {
                summary.executed += 1;
                match outcome {
                    Outcome::Exported(result) => summary.exported_images += result.images_exported,
                    Outcome::Imported { annotations, .. } => {
                        summary.imported_annotations += annotations
                    }
                    Outcome::Done => {}
                }
                log::info!("line {}: {}", line_no, controller.status());
            }
            Err(e) => {
                log::error!("line {}: {}", line_no, e);
                summary.failed += 1;
            }
        }
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> Result<Option<Message>, ScriptError> {
        parse_line(line, Path::new("/data"))
    }

    #[test]
    fn test_blank_and_comment_lines() {
        assert_eq!(parse(""), Ok(None));
        assert_eq!(parse("   # just a note"), Ok(None));
        assert_eq!(parse("segment # ask the model"), Ok(Some(Message::Segment)));
    }

    #[test]
    fn test_pointer_commands() {
        assert_eq!(
            parse("click 10 20.5"),
            Ok(Some(Message::AddPoint {
                x: 10.0,
                y: 20.5,
                polarity: Polarity::Positive
            }))
        );
        assert_eq!(
            parse("negative 1 2"),
            Ok(Some(Message::AddPoint {
                x: 1.0,
                y: 2.0,
                polarity: Polarity::Negative
            }))
        );
        assert_eq!(
            parse("zoom out 5 6"),
            Ok(Some(Message::Zoom {
                x: 5.0,
                y: 6.0,
                direction: ZoomDirection::Out
            }))
        );
        assert_eq!(
            parse("canvas 640 480"),
            Ok(Some(Message::Resize {
                width: 640,
                height: 480
            }))
        );
    }

    #[test]
    fn test_commit_takes_rest_of_line() {
        assert_eq!(
            parse("commit traffic light"),
            Ok(Some(Message::Commit {
                class_name: "traffic light".into()
            }))
        );
        assert!(matches!(
            parse("commit"),
            Err(ScriptError::MissingArgument { .. })
        ));
    }

    #[test]
    fn test_paths_and_modes() {
        assert_eq!(
            parse("open img/a.png"),
            Ok(Some(Message::SwitchImage(PathBuf::from("/data/img/a.png"))))
        );
        assert_eq!(
            parse("export /out detection"),
            Ok(Some(Message::Export {
                dir: PathBuf::from("/out"),
                mode: Some(LabelMode::Detection)
            }))
        );
        assert_eq!(
            parse("export labels"),
            Ok(Some(Message::Export {
                dir: PathBuf::from("/data/labels"),
                mode: None
            }))
        );
        assert!(matches!(
            parse("export /out voxels"),
            Err(ScriptError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_crop_commands() {
        assert_eq!(
            parse("crop 60 40 10 10.5"),
            Ok(Some(Message::SetCrop {
                x0: 60.0,
                y0: 40.0,
                x1: 10.0,
                y1: 10.5
            }))
        );
        assert_eq!(parse("crop-lock"), Ok(Some(Message::ToggleCropLock)));
        assert_eq!(
            parse("crop-all cropped"),
            Ok(Some(Message::CropAll {
                dir: PathBuf::from("/data/cropped")
            }))
        );
        assert!(matches!(
            parse("crop 1 2 3"),
            Err(ScriptError::MissingArgument { .. })
        ));
        assert!(matches!(
            parse("crop-save"),
            Err(ScriptError::MissingArgument { .. })
        ));
    }

    #[test]
    fn test_remove_index_is_optional() {
        assert_eq!(parse("remove"), Ok(Some(Message::RemoveAnnotation(None))));
        assert_eq!(
            parse("remove 2"),
            Ok(Some(Message::RemoveAnnotation(Some(2))))
        );
        assert!(matches!(
            parse("remove two"),
            Err(ScriptError::InvalidNumber { .. })
        ));
    }

    #[test]
    fn test_errors() {
        assert!(matches!(
            parse("fly 1 2"),
            Err(ScriptError::UnknownCommand { .. })
        ));
        assert!(matches!(
            parse("click 1"),
            Err(ScriptError::MissingArgument { .. })
        ));
        assert!(matches!(
            parse("zoom sideways 1 2"),
            Err(ScriptError::InvalidArgument { .. })
        ));
        assert!(matches!(
            parse("rename cat"),
            Err(ScriptError::MissingArgument { .. })
        ));
    }

    #[test]
    fn test_failing_commands_do_not_stop_the_script() {
        use crate::config::AppConfig;
        use crate::model::ImageSize;

        let mut controller = SessionController::new(AppConfig::new());
        controller.show_image(Path::new("a.png"), ImageSize::new(50, 50));
        let script = "canvas 50 50\nsegment\nbogus\nclick 10 10\nclick 20 20\nundo-point\n";
        let summary = run_script(&mut controller, script, Path::new("."));

        assert_eq!(summary.executed, 4);
        assert_eq!(summary.failed, 2);
        assert_eq!(controller.store().active().unwrap().points.len(), 1);
    }
}
