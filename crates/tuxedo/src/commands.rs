use std::collections::HashMap;

use editor::input::PointerButton;
use editor::{Key, PropertyValue};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ShellCommand {
    Help,
    Scenes,
    Load { path: String },
    Open { file: String },
    Save { path: Option<String> },
    Create { scene_id: String },
    Select { object_id: String },
    Deselect,
    Set { property: String, value: PropertyValue },
    Objects,
    Click { x: f64, y: f64, held_ms: u64 },
    Pan { dx: f64, dy: f64, button: PointerButton },
    Wheel { delta_y: f64 },
    Key { key: Key },
    Camera,
    Center { x: f64, y: f64 },
    ResetCamera,
    Stats,
    ClearPrefabs,
    Project,
    Assets,
    Quit,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct CommandParseError {
    pub(crate) reason: String,
    pub(crate) usage: String,
}

type ParseFn = fn(&[String]) -> Result<ShellCommand, CommandParseError>;

struct CommandSpec {
    name: &'static str,
    help: &'static str,
    arg_schema: &'static str,
    parse: ParseFn,
}

static BUILTIN_COMMANDS: [CommandSpec; 22] = [
    CommandSpec { name: "help", help: "List commands", arg_schema: "", parse: parse_help },
    CommandSpec { name: "scenes", help: "List scenes on the server", arg_schema: "", parse: parse_scenes },
    CommandSpec { name: "load", help: "Load a scene from the server", arg_schema: "<path>", parse: parse_load },
    CommandSpec { name: "open", help: "Load a scene from a local JSON file", arg_schema: "<file>", parse: parse_open },
    CommandSpec { name: "save", help: "Save the current scene", arg_schema: "[path]", parse: parse_save },
    CommandSpec { name: "create", help: "Create an empty scene on the server", arg_schema: "<scene_id>", parse: parse_create },
    CommandSpec { name: "select", help: "Select an object by id", arg_schema: "<object_id>", parse: parse_select },
    CommandSpec { name: "deselect", help: "Clear the selection", arg_schema: "", parse: parse_deselect },
    CommandSpec { name: "set", help: "Set a property on the selected object", arg_schema: "<property> <value>", parse: parse_set },
    CommandSpec { name: "objects", help: "List rendered object ids", arg_schema: "", parse: parse_objects },
    CommandSpec { name: "click", help: "Click at screen coordinates", arg_schema: "<x:f64> <y:f64> [held_ms:u64]", parse: parse_click },
    CommandSpec { name: "pan", help: "Drag the camera with the middle button", arg_schema: "<dx:f64> <dy:f64>", parse: parse_pan },
    CommandSpec { name: "wheel", help: "Scroll the mouse wheel", arg_schema: "<delta_y:f64>", parse: parse_wheel },
    CommandSpec { name: "key", help: "Press a camera key", arg_schema: "<left|right|up|down|+|->", parse: parse_key },
    CommandSpec { name: "camera", help: "Show camera scroll and zoom", arg_schema: "", parse: parse_camera },
    CommandSpec { name: "center", help: "Center the camera on a world point", arg_schema: "<x:f64> <y:f64>", parse: parse_center },
    CommandSpec { name: "reset_camera", help: "Reset scroll and zoom", arg_schema: "", parse: parse_reset_camera },
    CommandSpec { name: "stats", help: "Show registry and prefab cache stats", arg_schema: "", parse: parse_stats },
    CommandSpec { name: "clear_prefabs", help: "Drop cached prefab templates", arg_schema: "", parse: parse_clear_prefabs },
    CommandSpec { name: "project", help: "Show project info", arg_schema: "", parse: parse_project },
    CommandSpec { name: "assets", help: "List project assets", arg_schema: "", parse: parse_assets },
    CommandSpec { name: "quit", help: "Quit the shell", arg_schema: "", parse: parse_quit },
];

pub(crate) struct CommandRegistry {
    specs: &'static [CommandSpec],
    lookup_by_lower_name: HashMap<String, usize>,
}

impl CommandRegistry {
    pub(crate) fn with_builtins() -> Self {
        let specs: &'static [CommandSpec] = &BUILTIN_COMMANDS;
        let lookup_by_lower_name = specs
            .iter()
            .enumerate()
            .map(|(index, spec)| (spec.name.to_ascii_lowercase(), index))
            .collect();
        Self {
            specs,
            lookup_by_lower_name,
        }
    }

    /// Turns one input line into a command. `Ok(None)` means the line was blank.
    pub(crate) fn parse_line(&self, raw_line: &str) -> Result<Option<ShellCommand>, String> {
        let trimmed = raw_line.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }
        let tokens = tokenize_line(trimmed).map_err(|reason| format!("error: {reason}. usage: help"))?;
        let Some((command_name, args)) = tokens.split_first() else {
            return Ok(None);
        };
        let spec = self
            .lookup_by_lower_name
            .get(&command_name.to_ascii_lowercase())
            .and_then(|index| self.specs.get(*index))
            .ok_or_else(|| format!("error: unknown command '{command_name}'. try: help"))?;
        (spec.parse)(args)
            .map(Some)
            .map_err(|error| format!("error: {}. usage: {}", error.reason, error.usage))
    }

    /// Help lines in registration order.
    pub(crate) fn help_lines(&self) -> Vec<String> {
        self.specs
            .iter()
            .map(|spec| {
                if spec.arg_schema.is_empty() {
                    format!("{} - {}", spec.name, spec.help)
                } else {
                    format!("{} {} - {}", spec.name, spec.arg_schema, spec.help)
                }
            })
            .collect()
    }
}

fn tokenize_line(line: &str) -> Result<Vec<String>, String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut pending = false;

    for ch in line.chars() {
        match ch {
            '"' => {
                in_quotes = !in_quotes;
                pending = true;
            }
            c if c.is_whitespace() && !in_quotes => {
                if pending {
                    tokens.push(std::mem::take(&mut current));
                    pending = false;
                }
            }
            _ => {
                current.push(ch);
                pending = true;
            }
        }
    }

    if in_quotes {
        return Err("unterminated quoted string".to_string());
    }
    if pending {
        tokens.push(current);
    }
    Ok(tokens)
}

fn usage_error(reason: impl Into<String>, usage: &str) -> CommandParseError {
    CommandParseError {
        reason: reason.into(),
        usage: usage.to_string(),
    }
}

fn require_no_args(args: &[String], usage: &str) -> Result<(), CommandParseError> {
    if args.is_empty() {
        Ok(())
    } else {
        Err(usage_error("unexpected extra arguments", usage))
    }
}

fn require_one(args: &[String], name: &str, usage: &str) -> Result<String, CommandParseError> {
    match args {
        [value] => Ok(value.clone()),
        _ => Err(usage_error(
            format!("expected exactly one argument <{name}>"),
            usage,
        )),
    }
}

fn parse_number(raw: &str, name: &str, usage: &str) -> Result<f64, CommandParseError> {
    raw.parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| usage_error(format!("invalid {name} '{raw}' (expected f64)"), usage))
}

fn parse_point(args: &[String], usage: &str) -> Result<(f64, f64), CommandParseError> {
    match args {
        [x, y] => Ok((parse_number(x, "x", usage)?, parse_number(y, "y", usage)?)),
        _ => Err(usage_error("expected <x> <y>", usage)),
    }
}

fn parse_help(args: &[String]) -> Result<ShellCommand, CommandParseError> {
    require_no_args(args, "help")?;
    Ok(ShellCommand::Help)
}

fn parse_scenes(args: &[String]) -> Result<ShellCommand, CommandParseError> {
    require_no_args(args, "scenes")?;
    Ok(ShellCommand::Scenes)
}

fn parse_load(args: &[String]) -> Result<ShellCommand, CommandParseError> {
    let path = require_one(args, "path", "load <path>")?;
    Ok(ShellCommand::Load { path })
}

fn parse_open(args: &[String]) -> Result<ShellCommand, CommandParseError> {
    let file = require_one(args, "file", "open <file>")?;
    Ok(ShellCommand::Open { file })
}

fn parse_save(args: &[String]) -> Result<ShellCommand, CommandParseError> {
    match args {
        [] => Ok(ShellCommand::Save { path: None }),
        [path] => Ok(ShellCommand::Save {
            path: Some(path.clone()),
        }),
        _ => Err(usage_error("expected at most one argument [path]", "save [path]")),
    }
}

fn parse_create(args: &[String]) -> Result<ShellCommand, CommandParseError> {
    let scene_id = require_one(args, "scene_id", "create <scene_id>")?;
    Ok(ShellCommand::Create { scene_id })
}

fn parse_select(args: &[String]) -> Result<ShellCommand, CommandParseError> {
    let object_id = require_one(args, "object_id", "select <object_id>")?;
    Ok(ShellCommand::Select { object_id })
}

fn parse_deselect(args: &[String]) -> Result<ShellCommand, CommandParseError> {
    require_no_args(args, "deselect")?;
    Ok(ShellCommand::Deselect)
}

fn parse_set(args: &[String]) -> Result<ShellCommand, CommandParseError> {
    match args {
        [property, value] => Ok(ShellCommand::Set {
            property: property.clone(),
            value: PropertyValue::from_token(value),
        }),
        _ => Err(usage_error("expected <property> <value>", "set <property> <value>")),
    }
}

fn parse_objects(args: &[String]) -> Result<ShellCommand, CommandParseError> {
    require_no_args(args, "objects")?;
    Ok(ShellCommand::Objects)
}

fn parse_click(args: &[String]) -> Result<ShellCommand, CommandParseError> {
    const USAGE: &str = "click <x> <y> [held_ms]";
    let (point, held_ms) = match args {
        [x, y] => ([x.clone(), y.clone()], 0),
        [x, y, held] => {
            let held_ms = held.parse::<u64>().map_err(|_| {
                usage_error(format!("invalid held_ms '{held}' (expected u64)"), USAGE)
            })?;
            ([x.clone(), y.clone()], held_ms)
        }
        _ => return Err(usage_error("expected <x> <y> [held_ms]", USAGE)),
    };
    let (x, y) = parse_point(&point, USAGE)?;
    Ok(ShellCommand::Click { x, y, held_ms })
}

fn parse_pan(args: &[String]) -> Result<ShellCommand, CommandParseError> {
    let (dx, dy) = parse_point(args, "pan <dx> <dy>")?;
    Ok(ShellCommand::Pan {
        dx,
        dy,
        button: PointerButton::Middle,
    })
}

fn parse_wheel(args: &[String]) -> Result<ShellCommand, CommandParseError> {
    let raw = require_one(args, "delta_y", "wheel <delta_y>")?;
    let delta_y = parse_number(&raw, "delta_y", "wheel <delta_y>")?;
    Ok(ShellCommand::Wheel { delta_y })
}

fn parse_key(args: &[String]) -> Result<ShellCommand, CommandParseError> {
    const USAGE: &str = "key <left|right|up|down|+|->";
    let raw = require_one(args, "key", USAGE)?;
    match Key::from_name(&raw) {
        Key::Other => Err(usage_error(format!("unknown key '{raw}'"), USAGE)),
        key => Ok(ShellCommand::Key { key }),
    }
}

fn parse_camera(args: &[String]) -> Result<ShellCommand, CommandParseError> {
    require_no_args(args, "camera")?;
    Ok(ShellCommand::Camera)
}

fn parse_center(args: &[String]) -> Result<ShellCommand, CommandParseError> {
    let (x, y) = parse_point(args, "center <x> <y>")?;
    Ok(ShellCommand::Center { x, y })
}

fn parse_reset_camera(args: &[String]) -> Result<ShellCommand, CommandParseError> {
    require_no_args(args, "reset_camera")?;
    Ok(ShellCommand::ResetCamera)
}

fn parse_stats(args: &[String]) -> Result<ShellCommand, CommandParseError> {
    require_no_args(args, "stats")?;
    Ok(ShellCommand::Stats)
}

fn parse_clear_prefabs(args: &[String]) -> Result<ShellCommand, CommandParseError> {
    require_no_args(args, "clear_prefabs")?;
    Ok(ShellCommand::ClearPrefabs)
}

fn parse_project(args: &[String]) -> Result<ShellCommand, CommandParseError> {
    require_no_args(args, "project")?;
    Ok(ShellCommand::Project)
}

fn parse_assets(args: &[String]) -> Result<ShellCommand, CommandParseError> {
    require_no_args(args, "assets")?;
    Ok(ShellCommand::Assets)
}

fn parse_quit(args: &[String]) -> Result<ShellCommand, CommandParseError> {
    require_no_args(args, "quit")?;
    Ok(ShellCommand::Quit)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> Result<Option<ShellCommand>, String> {
        CommandRegistry::with_builtins().parse_line(line)
    }

    #[test]
    fn help_lists_commands_in_registration_order() {
        let lines = CommandRegistry::with_builtins().help_lines();

        assert_eq!(lines.len(), BUILTIN_COMMANDS.len());
        assert_eq!(lines[0], "help - List commands");
        assert_eq!(lines[2], "load <path> - Load a scene from the server");
        assert_eq!(lines[8], "set <property> <value> - Set a property on the selected object");
        assert_eq!(lines.last().map(String::as_str), Some("quit - Quit the shell"));
    }

    #[test]
    fn blank_lines_are_ignored() {
        assert_eq!(parse("   "), Ok(None));
    }

    #[test]
    fn unknown_command_reports_clear_error() {
        assert_eq!(
            parse("nope"),
            Err("error: unknown command 'nope'. try: help".to_string())
        );
    }

    #[test]
    fn names_are_case_insensitive() {
        assert_eq!(parse("DESELECT"), Ok(Some(ShellCommand::Deselect)));
    }

    #[test]
    fn bad_args_report_usage_hint() {
        assert_eq!(
            parse("wheel up"),
            Err("error: invalid delta_y 'up' (expected f64). usage: wheel <delta_y>".to_string())
        );
        assert_eq!(
            parse("key tab"),
            Err("error: unknown key 'tab'. usage: key <left|right|up|down|+|->".to_string())
        );
        assert!(parse("select").is_err());
        assert!(parse("quit now").is_err());
    }

    #[test]
    fn set_values_are_typed_from_tokens() {
        assert_eq!(
            parse("set x 12.5"),
            Ok(Some(ShellCommand::Set {
                property: "x".to_string(),
                value: PropertyValue::Number(12.5),
            }))
        );
        assert_eq!(
            parse("set visible false"),
            Ok(Some(ShellCommand::Set {
                property: "visible".to_string(),
                value: PropertyValue::Bool(false),
            }))
        );
        assert_eq!(
            parse("set text \"Hello there\""),
            Ok(Some(ShellCommand::Set {
                property: "text".to_string(),
                value: PropertyValue::String("Hello there".to_string()),
            }))
        );
    }

    #[test]
    fn pointer_commands_parse_coordinates() {
        assert_eq!(
            parse("click 10 20"),
            Ok(Some(ShellCommand::Click {
                x: 10.0,
                y: 20.0,
                held_ms: 0,
            }))
        );
        assert_eq!(
            parse("click 10 20 500"),
            Ok(Some(ShellCommand::Click {
                x: 10.0,
                y: 20.0,
                held_ms: 500,
            }))
        );
        assert_eq!(
            parse("pan -5 3"),
            Ok(Some(ShellCommand::Pan {
                dx: -5.0,
                dy: 3.0,
                button: PointerButton::Middle,
            }))
        );
        assert_eq!(parse("key +"), Ok(Some(ShellCommand::Key { key: Key::ZoomIn })));
    }

    #[test]
    fn save_path_is_optional() {
        assert_eq!(parse("save"), Ok(Some(ShellCommand::Save { path: None })));
        assert_eq!(
            parse("save rooms/town.json"),
            Ok(Some(ShellCommand::Save {
                path: Some("rooms/town.json".to_string()),
            }))
        );
    }

    #[test]
    fn tokenizer_handles_quotes_and_errors() {
        assert_eq!(
            tokenize_line("open \"my scenes/town.json\"").expect("tokens"),
            vec!["open", "my scenes/town.json"]
        );
        assert_eq!(tokenize_line("set text \"\"").expect("tokens"), vec!["set", "text", ""]);
        assert!(tokenize_line("open \"oops").is_err());
    }
}
