//! End-to-end checks: machine definition in, validated program out.
use std::rc::Rc;

use rstest::rstest;

use hearth_codegen::{compile, CodegenError};
use hearth_dsl::ast::{
    Device, Endpoint, EndpointAccess, Expr, Literal, MachineDefinition, OnBlock, OnTrigger, State,
    Stmt, SwitchEntry, SwitchLabel,
};
use hearth_dsl::core::{Identifier, SourceLocation};
use hearth_dsl::types::Type;
use hearth_mc::pretty_print;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn loc() -> SourceLocation {
    SourceLocation::default()
}

fn lamp_device() -> (Rc<Device>, Rc<Endpoint>) {
    let endpoint = Rc::new(Endpoint {
        name: Identifier::from("power"),
        eid: 1,
        ty: Type::UInt8,
        access: EndpointAccess::READ.with(EndpointAccess::WRITE),
    });
    let device = Rc::new(Device {
        name: Identifier::from("lamp"),
        address: [0x20; 16],
        endpoints: vec![endpoint.clone()],
    });
    (device, endpoint)
}

fn write(device: &Rc<Device>, endpoint: &Rc<Endpoint>, value: Expr) -> Stmt {
    Stmt::Write {
        device: device.clone(),
        endpoint: endpoint.clone(),
        value,
        location: loc(),
    }
}

fn u8_lit(value: u8) -> Expr {
    Expr::Literal {
        value: Literal::UInt8(value),
        location: loc(),
    }
}

fn one_state_machine(on_blocks: Vec<OnBlock>, statements: Vec<Stmt>) -> MachineDefinition {
    MachineDefinition {
        name: Identifier::from("hall_light"),
        variables: Vec::new(),
        states: vec![State {
            name: Identifier::from("idle"),
            variables: Vec::new(),
            on_blocks,
            statements,
        }],
    }
}

#[test]
fn compile_when_entry_write_then_program_with_on_init() {
    init_logging();
    let (device, endpoint) = lamp_device();
    let machine = one_state_machine(
        vec![OnBlock::Simple {
            trigger: OnTrigger::Entry,
            body: Stmt::Block {
                statements: vec![write(&device, &endpoint, u8_lit(1))],
                location: loc(),
            },
            location: loc(),
        }],
        vec![],
    );

    let program = compile(&machine, [0; 16]).unwrap();

    let entry = program.on_init().expect("on_init registered");
    assert_eq!(program.instructions()[0].label.as_ref(), Some(entry));
    assert_eq!(program.instructions().len(), 4);
    assert_eq!(
        pretty_print(&program),
        format!(
            ".version 0\n\
             .machine 0x00000000000000000000000000000000\n\
             .on_init {entry}\n\
             \n{entry}:\n\tld u32(1)\
             \n\tld u8(1)\
             \n\twrite\
             \n\tret"
        )
    );
}

#[test]
fn compile_when_two_devices_written_then_multiple_devices_error() {
    init_logging();
    let (lamp, lamp_power) = lamp_device();
    let blinds_power = Rc::new(Endpoint {
        name: Identifier::from("position"),
        eid: 9,
        ty: Type::UInt8,
        access: EndpointAccess::WRITE,
    });
    let blinds = Rc::new(Device {
        name: Identifier::from("blinds"),
        address: [0x21; 16],
        endpoints: vec![blinds_power.clone()],
    });

    let machine = one_state_machine(
        vec![],
        vec![
            write(&lamp, &lamp_power, u8_lit(1)),
            write(&blinds, &blinds_power, u8_lit(2)),
        ],
    );

    match compile(&machine, [0; 16]) {
        Err(CodegenError::CantDo(what)) => assert!(what.contains("multiple devices")),
        other => panic!("expected capability error, got {other:?}"),
    }
}

fn switch_over_cases(case_count: u32) -> MachineDefinition {
    let entries = (0..case_count)
        .map(|value| SwitchEntry {
            labels: vec![SwitchLabel {
                value: Some(value as i64),
                location: loc(),
            }],
            body: Stmt::Block {
                statements: vec![],
                location: loc(),
            },
        })
        .collect();
    one_state_machine(
        vec![],
        vec![Stmt::Switch {
            expr: Expr::Literal {
                value: Literal::UInt32(0),
                location: loc(),
            },
            entries,
            location: loc(),
        }],
    )
}

#[test]
fn compile_when_switch_with_255_cases_then_ok() {
    init_logging();
    let program = compile(&switch_over_cases(255), [0; 16]).unwrap();
    assert!(!program.instructions().is_empty());
}

#[test]
fn compile_when_switch_with_256_cases_then_capability_error() {
    init_logging();
    assert_eq!(
        compile(&switch_over_cases(256), [0; 16]),
        Err(CodegenError::CantDo(String::from("large switch blocks")))
    );
}

#[rstest]
#[case::entry(OnTrigger::Entry)]
#[case::periodic(OnTrigger::Periodic)]
fn compile_when_supported_trigger_then_entry_point_registered(#[case] trigger: OnTrigger) {
    init_logging();
    let (device, endpoint) = lamp_device();
    let machine = one_state_machine(
        vec![OnBlock::Simple {
            trigger,
            body: Stmt::Block {
                statements: vec![write(&device, &endpoint, u8_lit(1))],
                location: loc(),
            },
            location: loc(),
        }],
        vec![],
    );

    let program = compile(&machine, [0; 16]).unwrap();
    match trigger {
        OnTrigger::Entry => assert!(program.on_init().is_some()),
        OnTrigger::Periodic => assert!(program.on_periodic().is_some()),
        OnTrigger::Exit => unreachable!(),
    }
}

#[rstest]
#[case::exit(OnBlock::Simple {
    trigger: OnTrigger::Exit,
    body: Stmt::Block { statements: vec![], location: SourceLocation::default() },
    location: SourceLocation::default(),
})]
#[case::expression(OnBlock::Expr {
    condition: Expr::Literal { value: Literal::Bool(true), location: SourceLocation::default() },
    body: Stmt::Block { statements: vec![], location: SourceLocation::default() },
    location: SourceLocation::default(),
})]
#[case::update(OnBlock::Update {
    from: None,
    body: Stmt::Block { statements: vec![], location: SourceLocation::default() },
    location: SourceLocation::default(),
})]
fn compile_when_unsupported_trigger_then_capability_error(#[case] on_block: OnBlock) {
    init_logging();
    let machine = one_state_machine(vec![on_block], vec![]);
    assert!(matches!(
        compile(&machine, [0; 16]),
        Err(CodegenError::CantDo(_))
    ));
}

#[test]
fn compile_when_periodic_and_always_body_then_print_is_stable() {
    init_logging();
    let (device, endpoint) = lamp_device();
    let machine = one_state_machine(
        vec![OnBlock::Simple {
            trigger: OnTrigger::Periodic,
            body: Stmt::Block {
                statements: vec![write(&device, &endpoint, u8_lit(1))],
                location: loc(),
            },
            location: loc(),
        }],
        vec![write(&device, &endpoint, u8_lit(0))],
    );

    let program = compile(&machine, [0x42; 16]).unwrap();
    let first = pretty_print(&program);
    assert_eq!(first, pretty_print(&program));
    assert!(first.contains(".on_periodic"));
    assert!(first.contains("jump"));
    assert!(first.ends_with("\tret"));
}
