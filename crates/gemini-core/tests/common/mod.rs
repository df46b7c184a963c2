//! Simulated Gemini drive for integration tests
#![allow(dead_code)]

use gemini_core::config::{ConnectionConfig, ProtocolTiming};
use gemini_core::protocol::Transport;
use std::collections::{HashMap, HashSet, VecDeque};
use std::io::{self, Read, Write};
use std::sync::{Arc, Mutex, MutexGuard};

pub const GV6_REVISION: &str = "TREV-GV6-L3E_D1.50_F1.00";

/// Command that ends the factory settings block
pub const LAST_FACTORY_SETTING: &str = "!ERROK13,10,62,32";

const PARAMETERS: [&str; 5] = ["KDRIVE", "DRIVE", "DMEPIT", "DMVLIM", "ERES"];

struct State {
    pending: VecDeque<u8>,
    line: Vec<u8>,
    writes: usize,
    corrupt_at: HashSet<usize>,
    garble: bool,
    submitted: Vec<String>,
    revision: String,
    parameters: HashMap<String, String>,
    programs: HashMap<String, Vec<String>>,
    defining: Option<(String, Vec<String>)>,
    failures: HashMap<String, Option<u32>>,
    overrides: HashMap<String, Vec<String>>,
    motion: bool,
}

/// In-memory drive speaking the ASCII protocol
///
/// Echoes every character, honours backspaces and answers each submitted
/// line the way a GV6 in session communication mode does. Clones share the
/// same drive so a test can keep one to inspect what was sent.
#[derive(Clone)]
pub struct SimulatedDrive {
    state: Arc<Mutex<State>>,
}

impl SimulatedDrive {
    pub fn new() -> Self {
        Self::with_revision(GV6_REVISION)
    }

    pub fn with_revision(revision: &str) -> Self {
        let parameters = [
            ("DRIVE", "0"),
            ("KDRIVE", "1"),
            ("ERES", "8000"),
            ("DMEPIT", "42.0"),
            ("DMVLIM", "2.5"),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        Self {
            state: Arc::new(Mutex::new(State {
                pending: VecDeque::new(),
                line: Vec::new(),
                writes: 0,
                corrupt_at: HashSet::new(),
                garble: false,
                submitted: Vec::new(),
                revision: revision.to_string(),
                parameters,
                programs: HashMap::new(),
                defining: None,
                failures: HashMap::new(),
                overrides: HashMap::new(),
                motion: false,
            })),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    /// Every line submitted with a carriage return, as typed (including `!`)
    pub fn submitted(&self) -> Vec<String> {
        self.state().submitted.clone()
    }

    pub fn count_submitted(&self, line: &str) -> usize {
        self.state().submitted.iter().filter(|l| *l == line).count()
    }

    pub fn clear_log(&self) {
        self.state().submitted.clear();
    }

    /// Garble the characters written `offsets` writes from now
    pub fn corrupt_upcoming(&self, offsets: &[usize]) {
        let mut state = self.state();
        let base = state.writes;
        state.corrupt_at.extend(offsets.iter().map(|o| base + o));
    }

    /// Garble every character written from now on
    pub fn garble_all(&self, garble: bool) {
        self.state().garble = garble;
    }

    /// Answer `command` with `*UNDEFINED_LABEL` the next `times` times
    pub fn fail_times(&self, command: &str, times: u32) {
        self.state()
            .failures
            .insert(command.to_string(), Some(times));
    }

    /// Always answer `command` with `*UNDEFINED_LABEL`
    pub fn fail_always(&self, command: &str) {
        self.state().failures.insert(command.to_string(), None);
    }

    /// Answer `command` with fixed output lines
    pub fn override_reply(&self, command: &str, lines: &[&str]) {
        self.state().overrides.insert(
            command.to_string(),
            lines.iter().map(|l| l.to_string()).collect(),
        );
    }

    pub fn parameter(&self, name: &str) -> Option<String> {
        self.state().parameters.get(name).cloned()
    }

    pub fn program(&self, name: &str) -> Option<Vec<String>> {
        self.state().programs.get(name).cloned()
    }

    pub fn store_program(&self, name: &str, lines: &[&str]) {
        self.state().programs.insert(
            name.to_string(),
            lines.iter().map(|l| l.to_string()).collect(),
        );
    }

    pub fn set_motion(&self, moving: bool) {
        self.state().motion = moving;
    }
}

impl State {
    fn receive(&mut self, byte: u8) {
        let index = self.writes;
        self.writes += 1;
        match byte {
            b'\r' => {
                let line = String::from_utf8_lossy(&std::mem::take(&mut self.line)).to_string();
                self.submit(line);
            }
            0x08 => {
                self.line.pop();
                self.pending.push_back(0x08);
            }
            _ => {
                let seen = if self.garble || self.corrupt_at.remove(&index) {
                    byte ^ 0x20
                } else {
                    byte
                };
                self.line.push(seen);
                self.pending.push_back(seen);
            }
        }
    }

    fn should_fail(&mut self, command: &str) -> bool {
        match self.failures.get_mut(command) {
            Some(None) => true,
            Some(Some(0)) => false,
            Some(Some(n)) => {
                *n -= 1;
                true
            }
            None => false,
        }
    }

    fn submit(&mut self, line: String) {
        self.submitted.push(line.clone());
        let command = line.strip_prefix('!').unwrap_or(&line).to_string();

        let (lines, prompt) = if self.should_fail(&command) {
            (vec!["*UNDEFINED_LABEL".to_string()], self.defining.is_some())
        } else if self.defining.is_some() {
            if command == "END" {
                if let Some((name, body)) = self.defining.take() {
                    self.programs.insert(name, body);
                }
                (Vec::new(), false)
            } else {
                if let Some((_, body)) = self.defining.as_mut() {
                    body.push(command);
                }
                (Vec::new(), true)
            }
        } else {
            let lines = self.execute(&command);
            (lines, self.defining.is_some())
        };

        self.pending.push_back(b'\r');
        self.pending.extend(lines.join("\r").bytes());
        self.pending.push_back(b'\n');
        if prompt {
            self.pending.extend(b"- ");
        }
    }

    fn execute(&mut self, command: &str) -> Vec<String> {
        let undefined = vec!["*UNDEFINED_LABEL".to_string()];

        if let Some(lines) = self.overrides.get(command) {
            return lines.clone();
        }

        const SETTINGS: [&str; 7] = ["ECHO", "ERRLVL", "BOT", "EOT", "EOL", "ERRBAD", "ERROK"];
        if SETTINGS.iter().any(|s| command.starts_with(s)) {
            return Vec::new();
        }

        match command {
            "TREV" => return vec![format!("*{}", self.revision)],
            "TAS" => {
                let bit = if self.motion { '1' } else { '0' };
                return vec![format!("*TAS{}000_0000_0000_0000_0000_0000_0000", bit)];
            }
            "PS" | "C" | "S1" | "K" | "RESET" => return Vec::new(),
            _ => {}
        }

        if let Some(name) = command.strip_prefix("DEL ") {
            self.programs.remove(name);
            return Vec::new();
        }
        if let Some(name) = command.strip_prefix("DEF ") {
            self.defining = Some((name.to_string(), Vec::new()));
            return Vec::new();
        }
        if let Some(name) = command.strip_prefix("TPROG ") {
            return match self.programs.get(name) {
                Some(body) => Self::listing(body),
                None => undefined,
            };
        }
        if let Some(name) = command.strip_prefix("RUN ") {
            return match self.programs.get(name) {
                Some(body) => Self::listing(body),
                None => undefined,
            };
        }
        if let Some(name) = command.strip_prefix("PRUN ") {
            return if self.programs.contains_key(name) {
                Vec::new()
            } else {
                undefined
            };
        }

        for name in PARAMETERS {
            if let Some(value) = command.strip_prefix(name) {
                if value.is_empty() {
                    let current = self.parameters.get(name).cloned().unwrap_or_default();
                    return vec![format!("*{}{}", name, current)];
                }
                if value.parse::<f64>().is_ok() {
                    self.parameters.insert(name.to_string(), value.to_string());
                    return Vec::new();
                }
                return vec!["*INVALID_DATA".to_string()];
            }
        }

        // motion instructions are accepted without output
        const MOTION: [&str; 9] = ["A", "V", "D", "GO", "WAIT", "T", "L", "PLOOP", "PLN"];
        if MOTION.iter().any(|m| command.starts_with(m)) {
            return Vec::new();
        }

        undefined
    }

    fn listing(body: &[String]) -> Vec<String> {
        body.iter()
            .map(|l| format!("*{}", l))
            .chain(std::iter::once("*END".to_string()))
            .collect()
    }
}

impl Read for SimulatedDrive {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut state = self.state();
        let n = buf.len().min(state.pending.len());
        for slot in buf.iter_mut().take(n) {
            *slot = state.pending.pop_front().unwrap_or_default();
        }
        Ok(n)
    }
}

impl Write for SimulatedDrive {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut state = self.state();
        for &b in buf {
            state.receive(b);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Transport for SimulatedDrive {
    fn clear_input_buffer(&mut self) -> io::Result<()> {
        self.state().pending.clear();
        Ok(())
    }

    fn bytes_to_read(&mut self) -> io::Result<u32> {
        Ok(self.state().pending.len() as u32)
    }
}

/// Configuration with all protocol pauses removed
pub fn fast_config() -> ConnectionConfig {
    ConnectionConfig {
        timing: ProtocolTiming {
            inter_char_delay_ms: 0,
            poll_interval_ms: 0,
            retry_pause_ms: 0,
            command_pause_ms: 0,
            settle_delay_ms: 0,
        },
        ..ConnectionConfig::for_port("sim")
    }
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
