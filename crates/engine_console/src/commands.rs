//! Built-in console commands and the session state they share.
//!
//! Every handler receives the caller's origin (`stdin`, `script` or `argv`)
//! as its first argument, followed by the values parsed from its slots.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use anyhow::{Context, bail};
use engine_command::types::{INT, STRING};
use engine_command::{CommandHandler, CommandRegistry, Console, ConsoleLog, RegistrationError};
use engine_entity::{
    Capability, CapabilitySet, Container, Entity, Hook, Invocation, Matcher, System,
};
use engine_protocol::Protocol;

/// Name of the single extra parameter every handler receives.
pub const ORIGIN: &str = "origin";

/// A display name for sandbox entities.
pub struct Name(pub String);

impl Capability for Name {
    fn capability_name() -> &'static str {
        "Name"
    }
}

/// Ticks survived by a sandbox entity.
pub struct Age(pub u32);

impl Capability for Age {
    fn capability_name() -> &'static str {
        "Age"
    }
}

/// State shared by the built-in handlers.
pub struct Session {
    protocol: Protocol,
    log: Arc<ConsoleLog>,
    entities: RefCell<Container>,
    help: RefCell<Vec<String>>,
    output: RefCell<Vec<String>>,
}

impl Session {
    fn new(protocol: Protocol, log: Arc<ConsoleLog>) -> Self {
        let mut entities = Container::new();

        entities.add_system(
            System::builder("age").run(|_: Invocation, age: &mut Age| age.0 += 1),
        );

        let announce = Arc::clone(&log);
        entities.add_system(
            System::builder("announce")
                .on(Hook::Add)
                .on(Hook::Remove)
                .matching(Matcher::has::<Age>())
                .run(move |inv: Invocation, name: &mut Name| {
                    let verb = if inv.hook == Hook::Add { "spawned" } else { "removed" };
                    announce.push(format!("{verb} {} ({})", name.0, inv.entity.id()));
                }),
        );

        Self {
            protocol,
            log,
            entities: RefCell::new(entities),
            help: RefCell::new(Vec::new()),
            output: RefCell::new(Vec::new()),
        }
    }

    fn print(&self, line: impl Into<String>) {
        self.output.borrow_mut().push(line.into());
    }

    /// Lines printed by commands since the last call.
    pub fn take_output(&self) -> Vec<String> {
        std::mem::take(&mut *self.output.borrow_mut())
    }
}

/// Build the console with every built-in command registered.
pub fn build_console(
    protocol: Protocol,
    log: Arc<ConsoleLog>,
) -> Result<(Console, Rc<Session>), RegistrationError> {
    let session = Rc::new(Session::new(protocol, Arc::clone(&log)));
    let mut registry = CommandRegistry::new(1);
    register_builtins(&mut registry, &session)?;
    *session.help.borrow_mut() = registry.describe().to_vec();
    Ok((Console::new(registry, log), session))
}

fn register_builtins(
    registry: &mut CommandRegistry,
    session: &Rc<Session>,
) -> Result<(), RegistrationError> {
    let s = Rc::clone(session);
    registry.register(
        "help",
        CommandHandler::new([ORIGIN], move |_| {
            for line in s.help.borrow().iter() {
                s.print(line.as_str());
            }
            Ok(())
        }),
    )?;

    let s = Rc::clone(session);
    registry.register(
        "echo %",
        CommandHandler::new([ORIGIN, STRING], move |args| {
            let origin = args.string(0)?;
            let text = args.string(1)?;
            s.log.push(format!("[{origin}] {text}"));
            s.print(text);
            Ok(())
        }),
    )?;

    let s = Rc::clone(session);
    registry.register(
        "log",
        CommandHandler::new([ORIGIN], move |_| {
            for line in s.log.entries() {
                s.print(line);
            }
            Ok(())
        }),
    )?;

    let s = Rc::clone(session);
    registry.register(
        "clear",
        CommandHandler::new([ORIGIN], move |_| {
            s.log.clear();
            Ok(())
        }),
    )?;

    let s = Rc::clone(session);
    registry.register(
        "sum %-1000000,1000000 %-1000000,1000000",
        CommandHandler::new([ORIGIN, INT, INT], move |args| {
            s.print((args.int(1)? + args.int(2)?).to_string());
            Ok(())
        }),
    )?;

    register_protocol_commands(registry, session)?;
    register_entity_commands(registry, session)
}

fn register_protocol_commands(
    registry: &mut CommandRegistry,
    session: &Rc<Session>,
) -> Result<(), RegistrationError> {
    let s = Rc::clone(session);
    registry.register(
        "schema list",
        CommandHandler::new([ORIGIN], move |_| {
            for name in s.protocol.struct_names() {
                match s.protocol.packet_id(name) {
                    Some(id) => s.print(format!("packet {name} @ {id:#04x}")),
                    None => s.print(format!("struct {name}")),
                }
            }
            Ok(())
        }),
    )?;

    let s = Rc::clone(session);
    registry.register(
        "encode %64 %",
        CommandHandler::new([ORIGIN, STRING, STRING], move |args| {
            let name = args.string(1)?;
            let json: serde_json::Value =
                serde_json::from_str(args.string(2)?).context("invalid JSON")?;
            let record = s.protocol.value_from_json(name, &json)?;
            let bytes = s.protocol.encode_to_vec(name, &record)?;
            s.print(hex::encode(bytes));
            Ok(())
        }),
    )?;

    let s = Rc::clone(session);
    registry.register(
        "decode %64 %",
        CommandHandler::new([ORIGIN, STRING, STRING], move |args| {
            let name = args.string(1)?;
            let bytes = hex::decode(args.string(2)?).context("invalid hex")?;
            let record = s.protocol.decode_slice(name, &bytes)?;
            s.print(record.to_json().to_string());
            Ok(())
        }),
    )?;

    Ok(())
}

fn register_entity_commands(
    registry: &mut CommandRegistry,
    session: &Rc<Session>,
) -> Result<(), RegistrationError> {
    let s = Rc::clone(session);
    registry.register(
        "entity spawn %32",
        CommandHandler::new([ORIGIN, STRING], move |args| {
            let name = args.string(1)?.to_string();
            let caps = CapabilitySet::new().with(Name(name)).with(Age(0));
            let entity = s.entities.borrow_mut().add_entity(caps);
            s.print(entity.id().to_string());
            Ok(())
        }),
    )?;

    let s = Rc::clone(session);
    registry.register(
        "entity remove %1,2147483647",
        CommandHandler::new([ORIGIN, INT], move |args| {
            let id = u64::try_from(args.int(1)?)?;
            s.entities.borrow_mut().remove_entity(Entity::from_raw(id))?;
            Ok(())
        }),
    )?;

    let s = Rc::clone(session);
    registry.register(
        "entity tick %1,1000",
        CommandHandler::new([ORIGIN, INT], move |args| {
            let mut entities = s.entities.borrow_mut();
            for _ in 0..args.int(1)? {
                entities.tick();
            }
            Ok(())
        }),
    )?;

    let s = Rc::clone(session);
    registry.register(
        "entity list",
        CommandHandler::new([ORIGIN], move |_| {
            let entities = s.entities.borrow();
            if entities.entity_count() == 0 {
                bail!("no entities");
            }
            for (entity, caps) in entities.iter() {
                let name = caps.get::<Name>().map_or("?", |n| n.0.as_str());
                let age = caps.get::<Age>().map_or(0, |a| a.0);
                s.print(format!("{} {name} age={age}", entity.id()));
            }
            Ok(())
        }),
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use engine_command::{Argument, CommandError};

    use super::*;

    const PROTO: &str = r#"
        struct Position { x: f64, y: f64, z: f64 }
        packet Hello @ 0x00 {
            id: VarInt,
            name: string,
            coords: list<f32> [length = VarInt],
        }
    "#;

    fn console() -> (Console, Rc<Session>) {
        let protocol = Protocol::from_source(PROTO).unwrap();
        build_console(protocol, Arc::new(ConsoleLog::new(16))).unwrap()
    }

    fn run(console: &Console, session: &Session, line: &str) -> Result<Vec<String>, CommandError> {
        console.run_line(&[Argument::from("stdin")], line)?;
        Ok(session.take_output())
    }

    #[test]
    fn test_help_lists_commands() {
        let (console, session) = console();
        let help = run(&console, &session, "help").unwrap();
        assert!(help.contains(&"help".to_string()));
        assert!(help.contains(&"echo <string>".to_string()));
        assert!(help.contains(&"sum <int:-1000000,1000000> <int:-1000000,1000000>".to_string()));
        assert!(help.contains(&"entity spawn <string:32>".to_string()));
    }

    #[test]
    fn test_echo_and_log() {
        let (console, session) = console();
        assert_eq!(
            run(&console, &session, r#"echo "hello world""#).unwrap(),
            vec!["hello world"]
        );
        console
            .run_line(&[Argument::from("script")], "echo again")
            .unwrap();
        session.take_output();

        assert_eq!(
            run(&console, &session, "log").unwrap(),
            vec!["[script] again", "[stdin] hello world"]
        );
        run(&console, &session, "clear").unwrap();
        assert!(run(&console, &session, "log").unwrap().is_empty());
    }

    #[test]
    fn test_sum_bounds() {
        let (console, session) = console();
        assert_eq!(run(&console, &session, "sum 2 -5").unwrap(), vec!["-3"]);
        assert_eq!(
            run(&console, &session, "SUM 1000000 1000000").unwrap(),
            vec!["2000000"]
        );
        assert_eq!(
            run(&console, &session, "sum 1000001 0"),
            Err(CommandError::Parse("int too big (1000001 > 1000000)".into()))
        );
        assert_eq!(
            console.log().entries(),
            vec!["sum 1000001 0: int too big (1000001 > 1000000)"]
        );
    }

    #[test]
    fn test_schema_list() {
        let (console, session) = console();
        assert_eq!(
            run(&console, &session, "schema list").unwrap(),
            vec!["packet Hello @ 0x00", "struct Position"]
        );
    }

    #[test]
    fn test_encode_and_decode() {
        let (console, session) = console();
        let hex = run(
            &console,
            &session,
            r#"encode Hello {"id":42,"name":"hi","coords":[1.0,-2.0]}"#,
        )
        .unwrap();
        assert_eq!(hex, vec!["2a026869023f800000c0000000"]);

        let json = run(&console, &session, "decode Hello 2a026869023f800000c0000000").unwrap();
        let value: serde_json::Value = serde_json::from_str(&json[0]).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"id": 42, "name": "hi", "coords": [1.0, -2.0]})
        );
    }

    #[test]
    fn test_codec_errors_are_handler_failures() {
        let (console, session) = console();
        assert_eq!(
            run(&console, &session, "decode Hello 2a"),
            Err(CommandError::Handler("failed to fill whole buffer".into()))
        );
        assert_eq!(
            run(&console, &session, "decode Nope 00"),
            Err(CommandError::Handler("unknown struct: Nope".into()))
        );
        assert_eq!(
            run(&console, &session, "decode Hello zz"),
            Err(CommandError::Handler("invalid hex".into()))
        );
        assert_eq!(
            run(&console, &session, r#"encode Hello {"id":1}"#),
            Err(CommandError::Handler("missing field: Hello.name".into()))
        );
    }

    #[test]
    fn test_entity_sandbox() {
        let (console, session) = console();
        assert_eq!(run(&console, &session, "entity spawn zombie").unwrap(), vec!["1"]);
        assert_eq!(run(&console, &session, "entity spawn pig").unwrap(), vec!["2"]);
        run(&console, &session, "entity tick 3").unwrap();
        run(&console, &session, "entity remove 1").unwrap();

        assert_eq!(
            run(&console, &session, "entity list").unwrap(),
            vec!["2 pig age=3"]
        );
        assert_eq!(
            console.log().entries(),
            vec!["removed zombie (1)", "spawned pig (2)", "spawned zombie (1)"]
        );

        assert_eq!(
            run(&console, &session, "entity remove 1"),
            Err(CommandError::Handler("entity not found: Entity(1)".into()))
        );
        run(&console, &session, "entity remove 2").unwrap();
        assert_eq!(
            run(&console, &session, "entity list"),
            Err(CommandError::Handler("no entities".into()))
        );
    }
}
