use rvx_config::{BoardConfig, FlashConfig, Variant};
use rvx_hal::{DispatchError, EchoEvent, IdentifyEvent, SpiError};
use rvx_sim::transaction::{check_transactions, BusEvent};
use rvx_sim::{IrqEvent, Machine, RunState};

const BANNER: &str = "RVX - SPI demo\n\nPress Enter to read the SPI Flash Manufacturer ID.\n";

fn booted(config: BoardConfig) -> Machine {
    let mut machine = Machine::new(config).unwrap();
    machine.boot().unwrap();
    machine
}

fn with_flash(manufacturer_id: u8) -> BoardConfig {
    BoardConfig {
        flash: Some(FlashConfig {
            manufacturer_id,
            ..FlashConfig::macronix()
        }),
        ..BoardConfig::default()
    }
}

fn output(machine: &Machine) -> String {
    String::from_utf8(machine.console_output()).unwrap()
}

#[test]
fn test_boot_prints_banner_only() {
    let machine = booted(BoardConfig::default());
    assert_eq!(output(&machine), BANNER);
    assert_eq!(machine.state(), RunState::Idle);
}

#[test]
fn test_idle_path_produces_no_output() {
    let mut machine = booted(BoardConfig::default());
    machine.take_console_output();
    let outcomes = machine.idle(1_000).unwrap();
    assert!(outcomes.is_empty());
    assert!(machine.console_output().is_empty());
    assert_eq!(machine.interrupts(), 0);
}

#[test]
fn test_one_report_per_terminator() {
    let mut machine = booted(BoardConfig::default());
    machine.take_console_output();

    let outcomes = machine.type_keys(b"abc\nxy\n\n").unwrap();
    assert_eq!(outcomes.len(), 8);
    assert_eq!(machine.reports(), 3);
    assert_eq!(
        output(&machine),
        "Read out value: 194\nManufacturer: Macronix\n".repeat(3)
    );

    let reported = outcomes
        .iter()
        .filter(|o| {
            matches!(
                o.result,
                Ok(IrqEvent::Identify(IdentifyEvent::Reported { .. }))
            )
        })
        .count();
    assert_eq!(reported, 3);
    for outcome in &outcomes {
        assert_eq!(outcome.cause, 0x8000_0010);
    }
}

#[test]
fn test_every_key_runs_one_well_formed_transaction() {
    let mut machine = booted(BoardConfig::default());
    machine.type_keys(b"q\n").unwrap();

    let events = machine.bus_events();
    assert_eq!(check_transactions(&events), Ok(2));
    assert_eq!(
        &events[1..5],
        &[
            BusEvent::Select { slave: 0 },
            BusEvent::Exchange { tx: 0x9F, rx: 0xFF },
            BusEvent::Exchange { tx: 0x00, rx: 0xC2 },
            BusEvent::Deselect { slave: 0 },
        ]
    );
}

#[test]
fn test_mode_is_only_set_at_boot() {
    let config = BoardConfig {
        flash_bus: rvx_config::SpiBusConfig {
            mode: 3,
            ..Default::default()
        },
        ..BoardConfig::default()
    };
    let mut machine = booted(config);
    machine.type_keys(b"\n\n\n").unwrap();

    let modes: Vec<_> = machine
        .bus_events()
        .into_iter()
        .filter(|e| matches!(e, BusEvent::Mode { .. }))
        .collect();
    assert_eq!(modes, vec![BusEvent::Mode { bits: 3 }]);
    assert_eq!(machine.bus_events()[0], BusEvent::Mode { bits: 3 });
}

#[test]
fn test_vendor_names() {
    for (id, text) in [
        (0x01, "Read out value: 001\nManufacturer: Infineon\n"),
        (0x20, "Read out value: 032\nManufacturer: Micron\n"),
        (0xC2, "Read out value: 194\nManufacturer: Macronix\n"),
        (0xEF, "Read out value: 239\nManufacturer: Unknown\n"),
    ] {
        let mut machine = booted(with_flash(id));
        machine.take_console_output();
        machine.press(b'\n').unwrap();
        assert_eq!(output(&machine), text, "id {:#04x}", id);
    }
}

#[test]
fn test_unresponsive_flash_times_out() {
    let config = BoardConfig {
        flash: Some(FlashConfig {
            responsive: false,
            ..FlashConfig::macronix()
        }),
        flash_bus: rvx_config::SpiBusConfig {
            ready_poll_limit: 50,
            ..Default::default()
        },
        ..BoardConfig::default()
    };
    let mut machine = booted(config);
    machine.take_console_output();

    let outcome = machine.press(b'\n').unwrap().unwrap();
    assert_eq!(
        outcome.result,
        Err(DispatchError::Bus(SpiError::Timeout { polls: 50 }))
    );
    assert_eq!(machine.dispatch_failures(), 1);
    assert!(machine.console_output().is_empty());
    // The routine gave up before asserting chip select.
    assert!(!machine
        .bus_events()
        .iter()
        .any(|e| matches!(e, BusEvent::Select { .. })));

    // Delivery is re-armed after the failure.
    assert_eq!(machine.state(), RunState::Idle);
    assert!(machine.hart().interrupts_enabled());
    assert!(machine.press(b'\n').unwrap().is_some());
}

#[test]
fn test_timeout_after_select_releases_chip_select() {
    let config = BoardConfig {
        flash: Some(FlashConfig {
            ready_latency: 40,
            ..FlashConfig::macronix()
        }),
        flash_bus: rvx_config::SpiBusConfig {
            ready_poll_limit: 10,
            ..Default::default()
        },
        ..BoardConfig::default()
    };
    let mut machine = booted(config);
    machine.take_console_output();

    let outcome = machine.press(b'\n').unwrap().unwrap();
    assert_eq!(
        outcome.result,
        Err(DispatchError::Bus(SpiError::Timeout { polls: 10 }))
    );
    assert!(machine.console_output().is_empty());

    let events = machine.bus_events();
    assert_eq!(
        events,
        vec![
            BusEvent::Mode { bits: 0 },
            BusEvent::Select { slave: 0 },
            BusEvent::Exchange { tx: 0x9F, rx: 0xFF },
            BusEvent::Deselect { slave: 0 },
        ]
    );
    assert_eq!(check_transactions(&events), Ok(1));
    assert_eq!(machine.bus_transactions(), Ok(1));
}

#[test]
fn test_slow_flash_still_reports() {
    let config = BoardConfig {
        flash: Some(FlashConfig {
            ready_latency: 40,
            ..FlashConfig::macronix()
        }),
        ..BoardConfig::default()
    };
    let mut machine = booted(config);
    machine.press(b'\n').unwrap();
    assert_eq!(machine.reports(), 1);
}

#[test]
fn test_custom_terminator() {
    let config = BoardConfig {
        terminator: Some("cr".to_string()),
        ..BoardConfig::default()
    };
    let mut machine = booted(config);
    machine.type_keys(b"\n\r").unwrap();
    assert_eq!(machine.reports(), 1);
}

fn echo_board() -> BoardConfig {
    BoardConfig {
        name: "rvx-uart-demo".to_string(),
        variant: Variant::Echo,
        flash: None,
        ..BoardConfig::default()
    }
}

#[test]
fn test_echo_variant() {
    let mut machine = booted(echo_board());
    assert_eq!(
        output(&machine),
        "RVX - UART demo\n\nType something and press Enter:\n"
    );
    machine.take_console_output();

    let outcomes = machine.type_keys(b"A\x7f\r").unwrap();
    let events: Vec<_> = outcomes.iter().map(|o| o.result).collect();
    assert_eq!(
        events,
        vec![
            Ok(IrqEvent::Echo(EchoEvent::Echoed(b'A'))),
            Ok(IrqEvent::Echo(EchoEvent::Ignored(0x7F))),
            Ok(IrqEvent::Echo(EchoEvent::Prompted)),
        ]
    );
    assert_eq!(
        output(&machine),
        "A\n\nType something else and press enter: "
    );
    assert!(machine.bus_events().is_empty());
}

#[test]
fn test_snapshot_serializes() -> anyhow::Result<()> {
    let mut machine = booted(BoardConfig::default());
    machine.type_keys(b"\n")?;
    let json = serde_json::to_value(machine.snapshot())?;
    assert_eq!(json["state"], "idle");
    assert_eq!(json["interrupts"], 1);
    assert_eq!(json["hart"]["mie"], 1 << 16);
    Ok(())
}
