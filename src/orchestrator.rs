// orchestrator
// > NamerContext, the session state owned by the host glue and passed to
//   every handler
use crate::comm::{get_sn_epoch_f64, SnDateTime, SnRst};
use crate::comm_fs::{self, RetryPolicy};
use crate::error::Error;
use crate::host::{HostEvent, RecordingSource};
use crate::naming;
use crate::prompt::NamingPrompt;
use crate::series::{display, SeriesStore};
use crate::settings::SessionSettings;
use std::path::{Path, PathBuf};

#[derive(strum_macros::Display, Debug, Clone, PartialEq)]
pub enum StopOutcome {
    Renamed { from: PathBuf, to: PathBuf },
    // the user cancelled a prompt, nothing was changed
    Cancelled,
    // stop notification before Load
    Ignored,
}

#[derive(strum_macros::Display, Debug, Clone, PartialEq)]
pub enum EventOutcome {
    Registered,
    SettingsSaved,
    Stopped(StopOutcome),
    Unregistered,
}

pub struct NamerContext {
    settings_path: PathBuf,
    settings: SessionSettings,
    store: SeriesStore,
    rename_retry: RetryPolicy,
    listening: bool,
}

impl NamerContext {
    /// Loads the settings at `settings_path`, writing the defaults when the
    /// file does not exist yet.
    pub fn init(settings_path: &Path, rename_retry: RetryPolicy) -> SnRst<Self> {
        comm_fs::recover_replaced(settings_path)?;

        let settings = if settings_path.exists() {
            SessionSettings::load(settings_path)?
        } else {
            log::info!(
                "[NamerContext::init] no settings yet, writing defaults, path={}",
                settings_path.display()
            );
            let defaults = SessionSettings::default();
            defaults.save(settings_path)?;
            defaults
        };

        let store = SeriesStore::new(settings.resolve_series_path(settings_path));

        Ok(NamerContext {
            settings_path: settings_path.to_path_buf(),
            settings,
            store,
            rename_retry,
            listening: false,
        })
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub fn store(&self) -> &SeriesStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut SeriesStore {
        &mut self.store
    }

    pub fn update(&mut self, settings: SessionSettings) -> SnRst<()> {
        settings.save(&self.settings_path)?;

        self.store = SeriesStore::new(settings.resolve_series_path(&self.settings_path));
        self.settings = settings;

        log::info!(
            "[NamerContext::update] settings saved, series_path={}",
            self.store.path().display()
        );

        Ok(())
    }

    pub fn handle_event(
        &mut self,
        event: HostEvent,
        source: &dyn RecordingSource,
        prompt: &mut dyn NamingPrompt,
    ) -> SnRst<EventOutcome> {
        log::debug!("[NamerContext::handle_event] event={}", event);

        match event {
            HostEvent::Load => {
                self.listening = true;
                Ok(EventOutcome::Registered)
            }
            HostEvent::SettingsChanged(settings) => {
                self.update(settings)?;
                Ok(EventOutcome::SettingsSaved)
            }
            HostEvent::RecordingStopped => {
                if !self.listening {
                    log::warn!("[NamerContext::handle_event] stop notification before load, ignored");
                    return Ok(EventOutcome::Stopped(StopOutcome::Ignored));
                }
                let outcome = self.on_recording_stopped(source, prompt, chrono::Local::now())?;
                Ok(EventOutcome::Stopped(outcome))
            }
            HostEvent::Unload => {
                self.listening = false;
                Ok(EventOutcome::Unregistered)
            }
        }
    }

    /// Names the finished recording.
    ///
    /// The counter is written before the rename: a failing table leaves the
    /// file untouched, and a bad format string fails before either.
    pub fn on_recording_stopped(
        &mut self,
        source: &dyn RecordingSource,
        prompt: &mut dyn NamingPrompt,
        now: SnDateTime,
    ) -> SnRst<StopOutcome> {
        let file = source.finished_recording_path()?;

        let known = if self.settings.is_series {
            display::display_names(self.store.get_series()?, self.settings.sort_latest)
        } else {
            Vec::new()
        };

        let series_name = match prompt.ask_series_name(&known)? {
            Some(name) => name,
            None => return Ok(StopOutcome::Cancelled),
        };
        let key = naming::normalize_series_key(&series_name);

        let part_number = if self.settings.is_series {
            // seeded by set_latest below, a cancel leaves the table as is
            let latest = self.store.lookup(&key)?.map_or(0, |e| e.number);
            let default = latest.checked_add(1).ok_or_else(|| {
                Error::InvalidCallingParameter(format!("part number overflow, key={}", key))
            })?;

            match prompt.ask_part_number(default)? {
                Some(n) => Some(n),
                None => return Ok(StopOutcome::Cancelled),
            }
        } else {
            None
        };

        let base_name = naming::gen_file_name(
            &key,
            part_number,
            &now,
            &self.settings.datetime_format,
            self.settings.datetime_first,
        )?;

        let mut file_name = base_name;
        if let Some(ext) = file.extension() {
            file_name.push('.');
            file_name.push_str(&ext.to_string_lossy());
        }
        let target = file.with_file_name(file_name);

        if let Some(n) = part_number {
            self.store.set_latest(&key, n, get_sn_epoch_f64(&now))?;
        }

        comm_fs::rename_with_retry(&file, &target, self.rename_retry)?;

        log::info!(
            "[NamerContext::on_recording_stopped] renamed, from={}, to={}",
            file.display(),
            target.display()
        );

        Ok(StopOutcome::Renamed { from: file, to: target })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::GivenRecording;
    use crate::series::SeriesStore;
    use chrono::{Local, TimeZone};
    use std::collections::VecDeque;
    use std::fs;
    use tempfile::{tempdir, TempDir};

    struct ScriptedPrompt {
        names: VecDeque<Option<String>>,
        numbers: VecDeque<Option<u64>>,
        seen_known: Vec<Vec<String>>,
        seen_defaults: Vec<u64>,
    }

    impl ScriptedPrompt {
        fn new(names: Vec<Option<&str>>, numbers: Vec<Option<u64>>) -> Self {
            ScriptedPrompt {
                names: names.into_iter().map(|n| n.map(str::to_string)).collect(),
                numbers: numbers.into_iter().collect(),
                seen_known: Vec::new(),
                seen_defaults: Vec::new(),
            }
        }
    }

    impl NamingPrompt for ScriptedPrompt {
        fn ask_series_name(&mut self, known: &[String]) -> SnRst<Option<String>> {
            self.seen_known.push(known.to_vec());
            Ok(self.names.pop_front().flatten())
        }

        fn ask_part_number(&mut self, default: u64) -> SnRst<Option<u64>> {
            self.seen_defaults.push(default);
            Ok(self.numbers.pop_front().flatten())
        }
    }

    fn setup(settings: SessionSettings) -> (TempDir, NamerContext, PathBuf) {
        let dir = tempdir().unwrap();
        let settings_path = dir.path().join("settings.ini");
        settings.save(&settings_path).unwrap();
        SeriesStore::create(settings.resolve_series_path(&settings_path)).unwrap();

        let ctx = NamerContext::init(&settings_path, RetryPolicy::default()).unwrap();

        let recording = dir.path().join("2024-01-01 00-00-00.mkv");
        fs::write(&recording, b"frames").unwrap();

        (dir, ctx, recording)
    }

    fn series_settings() -> SessionSettings {
        SessionSettings {
            datetime_format: "%Y-%m-%d_%H-%M-%S".to_string(),
            ..SessionSettings::default()
        }
    }

    fn new_year() -> SnDateTime {
        Local.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn init_writes_default_settings() {
        let dir = tempdir().unwrap();
        let settings_path = dir.path().join("settings.ini");

        let ctx = NamerContext::init(&settings_path, RetryPolicy::default()).unwrap();

        assert_eq!(ctx.settings(), &SessionSettings::default());
        assert_eq!(SessionSettings::load(&settings_path).unwrap(), SessionSettings::default());
        assert_eq!(ctx.store().path(), dir.path().join("series.json"));
    }

    #[test]
    fn stop_renames_and_advances_counter() {
        let (dir, mut ctx, recording) = setup(series_settings());
        ctx.store_mut().set_latest("demo", 2, 1.0).unwrap();

        let mut prompt = ScriptedPrompt::new(vec![Some("Demo")], vec![Some(3)]);
        let outcome = ctx
            .on_recording_stopped(&GivenRecording::new(&recording), &mut prompt, new_year())
            .unwrap();

        let expected = dir.path().join("2024-01-01_00-00-00_demo_003.mkv");
        assert_eq!(
            outcome,
            StopOutcome::Renamed {
                from: recording.clone(),
                to: expected.clone()
            }
        );
        assert!(!recording.exists());
        assert_eq!(fs::read(&expected).unwrap(), b"frames");

        assert_eq!(prompt.seen_known, vec![vec!["demo".to_string()]]);
        assert_eq!(prompt.seen_defaults, vec![3]);

        let entry = ctx.store().lookup("demo").unwrap().unwrap();
        assert_eq!(entry.number, 3);
        assert_eq!(entry.timestamp, get_sn_epoch_f64(&new_year()));
    }

    #[test]
    fn new_series_defaults_to_one() {
        let (dir, mut ctx, recording) = setup(SessionSettings {
            datetime_first: false,
            ..series_settings()
        });

        let mut prompt = ScriptedPrompt::new(vec![Some("Talk Show")], vec![Some(1)]);
        ctx.on_recording_stopped(&GivenRecording::new(&recording), &mut prompt, new_year())
            .unwrap();

        assert_eq!(prompt.seen_defaults, vec![1]);
        assert!(dir.path().join("talk_show_001_2024-01-01_00-00-00.mkv").exists());
    }

    #[test]
    fn cancelled_prompt_changes_nothing() {
        let (_dir, mut ctx, recording) = setup(series_settings());

        let mut prompt = ScriptedPrompt::new(vec![None], vec![]);
        let outcome = ctx
            .on_recording_stopped(&GivenRecording::new(&recording), &mut prompt, new_year())
            .unwrap();

        assert_eq!(outcome, StopOutcome::Cancelled);
        assert!(recording.exists());
        assert!(ctx.store().get_series().unwrap().is_empty());
    }

    #[test]
    fn cancel_at_number_prompt_leaves_table_untouched() {
        let (_dir, mut ctx, recording) = setup(series_settings());
        ctx.store_mut().set_latest("demo", 2, 1.0).unwrap();
        let before = fs::read(ctx.store().path()).unwrap();

        let mut prompt =
            ScriptedPrompt::new(vec![Some("New Show"), Some("demo")], vec![None, None]);
        for _ in 0..2 {
            let outcome = ctx
                .on_recording_stopped(&GivenRecording::new(&recording), &mut prompt, new_year())
                .unwrap();
            assert_eq!(outcome, StopOutcome::Cancelled);
        }

        assert_eq!(prompt.seen_defaults, vec![1, 3]);
        assert!(recording.exists());
        assert_eq!(ctx.store().lookup("new_show").unwrap(), None);
        assert_eq!(fs::read(ctx.store().path()).unwrap(), before);
    }

    #[test]
    fn format_error_leaves_file_and_counter() {
        let (_dir, mut ctx, recording) = setup(SessionSettings {
            datetime_format: "%Y-%Q".to_string(),
            ..series_settings()
        });
        ctx.store_mut().set_latest("demo", 4, 1.0).unwrap();

        let mut prompt = ScriptedPrompt::new(vec![Some("demo")], vec![Some(5)]);
        let err = ctx
            .on_recording_stopped(&GivenRecording::new(&recording), &mut prompt, new_year())
            .unwrap_err();

        assert!(matches!(err, Error::FormatError(_)), "{err}");
        assert!(recording.exists());
        assert_eq!(ctx.store().lookup("demo").unwrap().unwrap().number, 4);
    }

    #[test]
    fn missing_table_leaves_file_unrenamed() {
        let (_dir, mut ctx, recording) = setup(series_settings());
        fs::remove_file(ctx.store().path()).unwrap();

        let mut prompt = ScriptedPrompt::new(vec![Some("demo")], vec![Some(1)]);
        let err = ctx
            .on_recording_stopped(&GivenRecording::new(&recording), &mut prompt, new_year())
            .unwrap_err();

        assert!(matches!(err, Error::StoreUnavailable(_)), "{err}");
        assert!(recording.exists());
        assert!(prompt.seen_known.is_empty());
    }

    #[test]
    fn non_series_skips_table_and_number() {
        let (dir, mut ctx, recording) = setup(SessionSettings {
            is_series: false,
            ..series_settings()
        });

        let mut prompt = ScriptedPrompt::new(vec![Some("Clip")], vec![]);
        ctx.on_recording_stopped(&GivenRecording::new(&recording), &mut prompt, new_year())
            .unwrap();

        assert!(prompt.seen_defaults.is_empty());
        assert!(dir.path().join("2024-01-01_00-00-00_clip.mkv").exists());
        assert!(ctx.store().get_series().unwrap().is_empty());
    }

    #[test]
    fn stop_before_load_is_ignored() {
        let (_dir, mut ctx, recording) = setup(series_settings());
        let source = GivenRecording::new(&recording);
        let mut prompt = ScriptedPrompt::new(vec![Some("demo")], vec![Some(1)]);

        let outcome = ctx
            .handle_event(HostEvent::RecordingStopped, &source, &mut prompt)
            .unwrap();
        assert_eq!(outcome, EventOutcome::Stopped(StopOutcome::Ignored));
        assert!(recording.exists());

        assert_eq!(
            ctx.handle_event(HostEvent::Load, &source, &mut prompt).unwrap(),
            EventOutcome::Registered
        );
        let outcome = ctx
            .handle_event(HostEvent::RecordingStopped, &source, &mut prompt)
            .unwrap();
        assert!(matches!(outcome, EventOutcome::Stopped(StopOutcome::Renamed { .. })));
    }

    #[test]
    fn settings_changed_rebinds_store() {
        let (dir, mut ctx, recording) = setup(series_settings());
        let source = GivenRecording::new(&recording);
        let mut prompt = ScriptedPrompt::new(vec![], vec![]);

        let changed = SessionSettings {
            series_path: "other.json".to_string(),
            sort_latest: false,
            ..series_settings()
        };
        ctx.handle_event(HostEvent::SettingsChanged(changed.clone()), &source, &mut prompt)
            .unwrap();

        assert_eq!(ctx.store().path(), dir.path().join("other.json"));
        assert_eq!(
            SessionSettings::load(&dir.path().join("settings.ini")).unwrap(),
            changed
        );
    }

    #[test]
    fn settings_change_with_comment_char_is_rejected() {
        let (dir, mut ctx, recording) = setup(series_settings());
        let source = GivenRecording::new(&recording);
        let mut prompt = ScriptedPrompt::new(vec![], vec![]);

        let changed = SessionSettings {
            series_path: "show#2.json".to_string(),
            ..series_settings()
        };
        let err = ctx
            .handle_event(HostEvent::SettingsChanged(changed), &source, &mut prompt)
            .unwrap_err();

        assert!(matches!(err, Error::InvalidConfigParameter(_)), "{err}");
        assert_eq!(ctx.settings(), &series_settings());
        assert_eq!(ctx.store().path(), dir.path().join("series.json"));

        let reloaded = NamerContext::init(&dir.path().join("settings.ini"), RetryPolicy::default())
            .unwrap();
        assert_eq!(reloaded.store().path(), dir.path().join("series.json"));
        assert!(reloaded.store().get_series().unwrap().is_empty());
    }
}
