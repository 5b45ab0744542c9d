// RVX Interrupt Demo - SPI/UART interrupt-driven firmware and simulator
// Copyright (C) 2026 RVX contributors
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default schema version for YAML configs
fn default_schema_version() -> String {
    "1.0".to_string()
}

fn default_true() -> bool {
    true
}

fn default_block_size() -> String {
    "4KiB".to_string()
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unsupported schema_version '{0}'; supported versions: '1.0'")]
    SchemaVersion(String),
    #[error("interrupt line {0} is not a machine interrupt bit (0..=31)")]
    IrqLine(u8),
    #[error("SPI mode {0} out of range (0..=3)")]
    SpiMode(u8),
    #[error("'{0}' must be greater than zero")]
    Zero(&'static str),
    #[error("console window {console:#x} overlaps flash bus window {flash_bus:#x}")]
    Overlap { console: u64, flash_bus: u64 },
    #[error("window at {base:#x} of {size:#x} bytes runs past the end of the address space")]
    WindowRange { base: u64, size: u64 },
    #[error("invalid size '{0}'")]
    Size(String),
    #[error("invalid terminator '{0}'; use lf, cr, a single character or a 0x.. byte")]
    Terminator(String),
    #[error("variant 'identify' needs a 'flash' device")]
    MissingFlash,
}

/// Which interrupt service routine the board runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    #[default]
    #[serde(alias = "spi")]
    Identify,
    #[serde(alias = "uart")]
    Echo,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ConsoleConfig {
    #[serde(default = "ConsoleConfig::default_base")]
    pub base: u64,
    #[serde(default = "default_block_size")]
    pub size: String,
    /// Machine interrupt bit the receive event is wired to.
    #[serde(default = "ConsoleConfig::default_irq")]
    pub irq: u8,
    #[serde(default = "ConsoleConfig::default_tx_poll_limit")]
    pub tx_poll_limit: u32,
}

impl ConsoleConfig {
    fn default_base() -> u64 {
        0x8000_0000
    }

    fn default_irq() -> u8 {
        16
    }

    fn default_tx_poll_limit() -> u32 {
        100_000
    }
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            base: Self::default_base(),
            size: default_block_size(),
            irq: Self::default_irq(),
            tx_poll_limit: Self::default_tx_poll_limit(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct SpiBusConfig {
    #[serde(default = "SpiBusConfig::default_base")]
    pub base: u64,
    #[serde(default = "default_block_size")]
    pub size: String,
    /// SPI mode number, CPOL in bit 1 and CPHA in bit 0.
    #[serde(default)]
    pub mode: u8,
    #[serde(default = "SpiBusConfig::default_divider")]
    pub divider: u32,
    /// Status reads before a ready wait reports a timeout.
    #[serde(default = "SpiBusConfig::default_ready_poll_limit")]
    pub ready_poll_limit: u32,
}

impl SpiBusConfig {
    fn default_base() -> u64 {
        0x8003_0000
    }

    fn default_divider() -> u32 {
        4
    }

    fn default_ready_poll_limit() -> u32 {
        10_000
    }
}

impl Default for SpiBusConfig {
    fn default() -> Self {
        Self {
            base: Self::default_base(),
            size: default_block_size(),
            mode: 0,
            divider: Self::default_divider(),
            ready_poll_limit: Self::default_ready_poll_limit(),
        }
    }
}

/// Serial NOR flash attached to chip select 0.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct FlashConfig {
    pub manufacturer_id: u8,
    #[serde(default)]
    pub memory_type: u8,
    #[serde(default)]
    pub capacity: u8,
    /// Controller busy time per exchanged byte, in bus ticks.
    #[serde(default = "FlashConfig::default_ready_latency")]
    pub ready_latency: u32,
    /// When false the controller never reports ready, as with a hung device.
    #[serde(default = "default_true")]
    pub responsive: bool,
}

impl FlashConfig {
    fn default_ready_latency() -> u32 {
        2
    }

    /// Macronix MX25L3233F, the part on the reference board.
    pub fn macronix() -> Self {
        Self {
            manufacturer_id: 0xC2,
            memory_type: 0x20,
            capacity: 0x16,
            ready_latency: Self::default_ready_latency(),
            responsive: true,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct BoardConfig {
    #[serde(default = "default_schema_version")]
    pub schema_version: String,
    pub name: String,
    #[serde(default)]
    pub variant: Variant,
    /// Overrides the variant's report/prompt key.
    #[serde(default)]
    pub terminator: Option<String>,
    #[serde(default)]
    pub console: ConsoleConfig,
    #[serde(default)]
    pub flash_bus: SpiBusConfig,
    #[serde(default)]
    pub flash: Option<FlashConfig>,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            schema_version: default_schema_version(),
            name: "rvx-spi-demo".to_string(),
            variant: Variant::Identify,
            terminator: None,
            console: ConsoleConfig::default(),
            flash_bus: SpiBusConfig::default(),
            flash: Some(FlashConfig::macronix()),
        }
    }
}

impl BoardConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read board config at {:?}", path))?;
        Self::from_yaml(&content).with_context(|| format!("Invalid board config {:?}", path))
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let board: Self =
            serde_yaml::from_str(yaml).context("Failed to parse Board Config YAML")?;
        board.validate()?;
        Ok(board)
    }

    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.schema_version != "1.0" {
            return Err(ConfigError::SchemaVersion(self.schema_version.clone()));
        }
        if self.console.irq > 31 {
            return Err(ConfigError::IrqLine(self.console.irq));
        }
        if self.flash_bus.mode > 3 {
            return Err(ConfigError::SpiMode(self.flash_bus.mode));
        }
        if self.flash_bus.ready_poll_limit == 0 {
            return Err(ConfigError::Zero("flash_bus.ready_poll_limit"));
        }
        if self.console.tx_poll_limit == 0 {
            return Err(ConfigError::Zero("console.tx_poll_limit"));
        }
        if self.variant == Variant::Identify && self.flash.is_none() {
            return Err(ConfigError::MissingFlash);
        }

        let console_size = self.console_size()?;
        let bus_size = self.flash_bus_size()?;
        let console = self.console.base..window_end(self.console.base, console_size)?;
        let bus = self.flash_bus.base..window_end(self.flash_bus.base, bus_size)?;
        if console.start < bus.end && bus.start < console.end {
            return Err(ConfigError::Overlap {
                console: self.console.base,
                flash_bus: self.flash_bus.base,
            });
        }

        self.terminator_byte()?;
        Ok(())
    }

    pub fn console_size(&self) -> std::result::Result<u64, ConfigError> {
        parse_size(&self.console.size).map_err(|_| ConfigError::Size(self.console.size.clone()))
    }

    pub fn flash_bus_size(&self) -> std::result::Result<u64, ConfigError> {
        parse_size(&self.flash_bus.size)
            .map_err(|_| ConfigError::Size(self.flash_bus.size.clone()))
    }

    /// Configured terminator override, if any.
    pub fn terminator_byte(&self) -> std::result::Result<Option<u8>, ConfigError> {
        self.terminator.as_deref().map(parse_terminator).transpose()
    }
}

fn window_end(base: u64, size: u64) -> std::result::Result<u64, ConfigError> {
    base.checked_add(size).ok_or(ConfigError::WindowRange { base, size })
}

fn parse_terminator(value: &str) -> std::result::Result<u8, ConfigError> {
    let invalid = || ConfigError::Terminator(value.to_string());
    match value.trim_matches(' ').to_ascii_lowercase().as_str() {
        "lf" | "newline" | "\\n" => return Ok(b'\n'),
        "cr" | "return" | "\\r" => return Ok(b'\r'),
        _ => {}
    }
    if let Some(hex) = value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        return u8::from_str_radix(hex, 16).map_err(|_| invalid());
    }
    match value.as_bytes() {
        [byte] => Ok(*byte),
        _ => Err(invalid()),
    }
}

pub fn parse_size(size_str: &str) -> Result<u64> {
    use human_size::{Byte, Size, SpecificSize};
    let s: Size = size_str
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid size format: {}", e))?;
    let bytes: SpecificSize<Byte> = s.into();
    Ok(bytes.value() as u64)
}

/// Expands `\n`, `\r`, `\t`, `\\` and `\xNN` escapes in typed console input.
pub fn parse_key_escapes(input: &str) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(input.len());
    let mut bytes = input.bytes();
    while let Some(b) = bytes.next() {
        if b != b'\\' {
            out.push(b);
            continue;
        }
        match bytes.next() {
            Some(b'n') => out.push(b'\n'),
            Some(b'r') => out.push(b'\r'),
            Some(b't') => out.push(b'\t'),
            Some(b'\\') => out.push(b'\\'),
            Some(b'x') => {
                let hi = bytes.next();
                let lo = bytes.next();
                let digits = match (hi, lo) {
                    (Some(hi), Some(lo)) => [hi, lo],
                    _ => anyhow::bail!("Truncated \\x escape in {:?}", input),
                };
                let text = std::str::from_utf8(&digits)?;
                let value = u8::from_str_radix(text, 16)
                    .with_context(|| format!("Invalid \\x escape '\\x{}'", text))?;
                out.push(value);
            }
            Some(other) => anyhow::bail!("Unknown escape '\\{}' in {:?}", other as char, input),
            None => anyhow::bail!("Trailing backslash in {:?}", input),
        }
    }
    Ok(out)
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct TestInputs {
    /// Board config path, relative to the script. Built-in board when absent.
    #[serde(default)]
    pub board: Option<String>,
    /// Console input, with `\n`-style escapes.
    pub keys: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy)]
#[serde(deny_unknown_fields)]
pub struct TestLimits {
    pub max_interrupts: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct UartContainsAssertion {
    pub uart_contains: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct ReportCountAssertion {
    pub reports: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct FailureCountAssertion {
    pub dispatch_failures: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(untagged)]
pub enum TestAssertion {
    UartContains(UartContainsAssertion),
    ReportCount(ReportCountAssertion),
    FailureCount(FailureCountAssertion),
}

/// Scripted console session checked by `rvx-sim test`.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct TestScript {
    pub schema_version: String,
    pub inputs: TestInputs,
    pub limits: TestLimits,
    #[serde(default)]
    pub assertions: Vec<TestAssertion>,
}

impl TestScript {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let f = std::fs::File::open(&path)
            .with_context(|| format!("Failed to open test script at {:?}", path.as_ref()))?;
        let script: Self =
            serde_yaml::from_reader(f).context("Failed to parse Test Script YAML")?;
        script.validate()?;
        Ok(script)
    }

    pub fn validate(&self) -> Result<()> {
        if self.schema_version != "1.0" {
            anyhow::bail!(
                "Unsupported schema_version '{}'. Supported versions: '1.0'",
                self.schema_version
            );
        }

        if self.limits.max_interrupts == 0 {
            anyhow::bail!("Limit 'max_interrupts' must be greater than zero");
        }

        parse_key_escapes(&self.inputs.keys)?;
        Ok(())
    }

    /// Board config for this script, resolved relative to `script_dir`.
    pub fn load_board(&self, script_dir: &Path) -> Result<BoardConfig> {
        match &self.inputs.board {
            Some(board) => BoardConfig::from_file(script_dir.join(board)),
            None => {
                tracing::debug!("No board in test script; using the built-in board");
                Ok(BoardConfig::default())
            }
        }
    }
}
