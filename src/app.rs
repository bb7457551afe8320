use std::time::Instant;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::action::Action;
use crate::analysis::{self, Metric, Report, ReportLimits, Thresholds};
use crate::chart::ChartPoint;
use crate::config::{Config, KeybindsConfig, parse_key};
use crate::system::snapshot::Snapshot;
use crate::system::{Collector, Profile, SnapshotStore};
use crate::ui::theme::Theme;

const STATUS_TTL_SECS: u64 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Help,
}

#[derive(Debug, Clone)]
pub struct ResolvedKeybinds {
    pub quit: KeyCode,
    pub cycle_metric: KeyCode,
    pub help: KeyCode,
    pub refresh: KeyCode,
}

impl ResolvedKeybinds {
    pub fn from_config(kb: &KeybindsConfig) -> Self {
        Self {
            quit: parse_key(&kb.quit).unwrap_or(KeyCode::Char('q')),
            cycle_metric: parse_key(&kb.cycle_metric).unwrap_or(KeyCode::Char('m')),
            help: parse_key(&kb.help).unwrap_or(KeyCode::Char('?')),
            refresh: parse_key(&kb.refresh).unwrap_or(KeyCode::Char('r')),
        }
    }

    /// Returns (key_label, description) pairs for all configurable keybinds.
    pub fn help_entries(&self) -> Vec<(String, &'static str)> {
        vec![
            (key_label(self.quit), "Quit"),
            (key_label(self.cycle_metric), "Cycle charted metric"),
            (key_label(self.refresh), "Collect now"),
            (key_label(self.help), "Toggle help"),
            ("Ctrl+C".to_string(), "Quit (always)"),
        ]
    }
}

pub fn key_label(code: KeyCode) -> String {
    match code {
        KeyCode::Char(' ') => "Space".to_string(),
        KeyCode::Char(c) => c.to_string(),
        KeyCode::Enter => "Enter".to_string(),
        KeyCode::Esc => "Esc".to_string(),
        KeyCode::Tab => "Tab".to_string(),
        KeyCode::Backspace => "Bksp".to_string(),
        KeyCode::F(n) => format!("F{n}"),
        _ => "?".to_string(),
    }
}

pub struct App {
    pub running: bool,
    pub collector: Collector,
    pub store: SnapshotStore,
    pub metric: Metric,
    pub input_mode: InputMode,
    pub theme: Theme,
    pub status_message: Option<(String, Instant)>,
    pub keybinds: ResolvedKeybinds,
    thresholds: Thresholds,
    report_limits: ReportLimits,
}

impl App {
    pub fn new(config: &Config) -> Self {
        let collector = Collector::new(config.limits.collect_options(Profile::Live));
        let mut app = App {
            running: true,
            collector,
            store: SnapshotStore::with_capacity(config.live.history),
            metric: Metric::Unevictable,
            input_mode: InputMode::Normal,
            theme: Theme::from_config(&config.colors.theme),
            status_message: None,
            keybinds: ResolvedKeybinds::from_config(&config.keybinds),
            thresholds: config.thresholds.clone(),
            report_limits: config.limits.report_limits(),
        };
        app.collect();
        app
    }

    pub fn collect(&mut self) {
        let snapshot = self.collector.collect();
        if let Some(evicted) = self.store.push(snapshot) {
            tracing::trace!(evicted = %evicted.timestamp, "history full, dropped oldest");
        }
        self.expire_status();
    }

    /// Drops the status message once it has been shown for `STATUS_TTL_SECS`.
    pub fn expire_status(&mut self) {
        if let Some((_, created)) = &self.status_message
            && created.elapsed().as_secs() >= STATUS_TTL_SECS
        {
            self.status_message = None;
        }
    }

    pub fn latest(&self) -> Option<&Snapshot> {
        self.store.last()
    }

    /// The selected metric over the whole history, oldest first.
    pub fn series(&self) -> Vec<ChartPoint> {
        self.metric.series(self.store.iter())
    }

    pub fn analyze(&self) -> Report {
        analysis::analyze(self.store.iter(), &self.thresholds, self.report_limits)
    }

    pub fn map_key(&self, key: KeyEvent) -> Action {
        // Ctrl+C always quits (hardwired safety)
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            return Action::Quit;
        }

        match self.input_mode {
            InputMode::Normal => self.map_key_normal(key),
            InputMode::Help => self.map_key_help(key),
        }
    }

    fn map_key_normal(&self, key: KeyEvent) -> Action {
        let code = key.code;
        let kb = &self.keybinds;

        if code == kb.quit {
            return Action::Quit;
        }
        if code == kb.cycle_metric {
            return Action::CycleMetric;
        }
        if code == kb.help {
            return Action::ToggleHelp;
        }
        if code == kb.refresh {
            return Action::Refresh;
        }
        Action::None
    }

    fn map_key_help(&self, key: KeyEvent) -> Action {
        let code = key.code;
        // In help mode, only the help key and Esc dismiss, everything else is ignored
        if code == self.keybinds.help || code == KeyCode::Esc {
            return Action::ToggleHelp;
        }
        Action::None
    }

    pub fn dispatch(&mut self, action: Action) {
        match action {
            Action::Quit => self.running = false,
            Action::CycleMetric => {
                self.metric = self.metric.next();
                self.status_message = Some((
                    format!("Charting {}", self.metric.label()),
                    Instant::now(),
                ));
            }
            Action::ToggleHelp => {
                self.input_mode = if self.input_mode == InputMode::Help {
                    InputMode::Normal
                } else {
                    InputMode::Help
                };
            }
            Action::Refresh => self.collect(),
            Action::None => {}
        }
    }

    pub fn show_help(&self) -> bool {
        self.input_mode == InputMode::Help
    }

    pub fn help_entries(&self) -> Vec<(String, &'static str)> {
        self.keybinds.help_entries()
    }
}
