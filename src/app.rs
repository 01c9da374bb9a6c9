use std::time::Instant;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::action::Action;
use crate::config::Config;
use crate::system::collector::Collector;
use crate::system::process::ProcessSnapshot;
use crate::system::procfs::ProcfsError;
use crate::system::snapshot::SystemSnapshot;

pub struct App {
    pub running: bool,
    pub collector: Collector,
    pub snapshot: SystemSnapshot,
    pub scroll: usize,
    /// Table rows that fit on screen, updated on every draw.
    pub page_size: usize,
    pub max_processes: usize,
    pub status_message: Option<(String, Instant)>,
}

impl App {
    /// Takes the first snapshot; fails only if procfs itself is unusable.
    pub fn new(mut collector: Collector, config: &Config) -> Result<Self, ProcfsError> {
        let snapshot = collector.refresh()?;
        Ok(App {
            running: true,
            collector,
            snapshot,
            scroll: 0,
            page_size: 1,
            max_processes: config.general.max_processes,
            status_message: None,
        })
    }

    pub fn refresh_data(&mut self) -> Result<(), ProcfsError> {
        self.snapshot = self.collector.refresh()?;
        self.clamp_scroll();

        // Clear expired status messages (older than 3 seconds)
        if let Some((_, created)) = &self.status_message
            && created.elapsed().as_secs() >= 3
        {
            self.status_message = None;
        }
        Ok(())
    }

    /// Processes eligible for display, already in cpu order.
    pub fn visible_processes(&self) -> &[ProcessSnapshot] {
        let all = &self.snapshot.processes;
        if self.max_processes > 0 && all.len() > self.max_processes {
            &all[..self.max_processes]
        } else {
            all
        }
    }

    pub fn map_key(&self, key: KeyEvent) -> Action {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return Action::Quit;
        }
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => Action::Quit,
            KeyCode::Char('r') => Action::Refresh,
            KeyCode::Up | KeyCode::Char('k') => Action::ScrollUp,
            KeyCode::Down | KeyCode::Char('j') => Action::ScrollDown,
            KeyCode::PageUp => Action::PageUp,
            KeyCode::PageDown => Action::PageDown,
            KeyCode::Home | KeyCode::Char('g') => Action::ScrollTop,
            _ => Action::None,
        }
    }

    pub fn dispatch(&mut self, action: Action) -> Result<(), ProcfsError> {
        match action {
            Action::Quit => self.running = false,
            Action::Refresh => {
                self.refresh_data()?;
                self.status_message = Some(("Refreshed".to_string(), Instant::now()));
            }
            Action::ScrollUp => self.scroll = self.scroll.saturating_sub(1),
            Action::ScrollDown => self.scroll += 1,
            Action::PageUp => self.scroll = self.scroll.saturating_sub(self.page_size),
            Action::PageDown => self.scroll += self.page_size,
            Action::ScrollTop => self.scroll = 0,
            Action::None => {}
        }
        self.clamp_scroll();
        Ok(())
    }

    fn clamp_scroll(&mut self) {
        let max = self.visible_processes().len().saturating_sub(self.page_size);
        self.scroll = self.scroll.min(max);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::clock::ClockTicks;
    use crate::system::collector::CpuConvention;
    use crate::system::fixture::FakeProc;
    use crate::system::metrics::{SourcePaths, SystemMetrics};

    fn app(fake: &FakeProc, max_processes: usize) -> App {
        fake.write("stat", "cpu  10 0 0 90 0 0 0 0 0 0\n");
        fake.write("uptime", "1000.0 0.0\n");
        for pid in 1..=5 {
            fake.add_process(pid, 0, 1_000, [pid as u64 * 100, 0, 0, 0], 0);
        }
        let metrics = SystemMetrics::new(SourcePaths {
            proc_root: fake.root().to_path_buf(),
            os_release: fake.root().join("os-release"),
            passwd: fake.root().join("passwd"),
        })
        .unwrap();
        let collector = Collector::with_clock(metrics, ClockTicks::new(100), CpuConvention::Cumulative);
        let mut config = Config::default();
        config.general.max_processes = max_processes;
        App::new(collector, &config).unwrap()
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn quits_on_q_and_ctrl_c() {
        let fake = FakeProc::new("app_quit");
        let mut app = app(&fake, 0);
        assert_eq!(app.map_key(key(KeyCode::Char('q'))), Action::Quit);
        assert_eq!(
            app.map_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Action::Quit
        );
        app.dispatch(Action::Quit).unwrap();
        assert!(!app.running);
    }

    #[test]
    fn max_processes_limits_rows() {
        let fake = FakeProc::new("app_limit");
        let app = app(&fake, 3);
        let pids: Vec<u32> = app.visible_processes().iter().map(|p| p.pid()).collect();
        assert_eq!(pids, vec![5, 4, 3]);
    }

    #[test]
    fn scrolling_is_clamped() {
        let fake = FakeProc::new("app_scroll");
        let mut app = app(&fake, 0);
        app.page_size = 2;
        app.dispatch(Action::ScrollUp).unwrap();
        assert_eq!(app.scroll, 0);
        app.dispatch(Action::PageDown).unwrap();
        app.dispatch(Action::PageDown).unwrap();
        app.dispatch(Action::PageDown).unwrap();
        assert_eq!(app.scroll, 3);
        app.dispatch(Action::ScrollTop).unwrap();
        assert_eq!(app.scroll, 0);
    }

    #[test]
    fn refresh_sets_status_message() {
        let fake = FakeProc::new("app_refresh");
        let mut app = app(&fake, 0);
        app.dispatch(Action::Refresh).unwrap();
        assert_eq!(app.snapshot.processes.len(), 5);
        assert!(app.status_message.is_some());
    }
}
