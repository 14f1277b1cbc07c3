//! Job configuration files: one YAML or JSON document per job, all in a
//! single directory. A malformed file is skipped with a warning so the
//! rest of the set still loads.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use tracing::warn;

use crate::model::{Job, JobSpec};

const JOB_EXTENSIONS: [&str; 3] = ["yaml", "yml", "json"];

pub struct JobLoader {
    config_dir: PathBuf,
}

impl JobLoader {
    pub fn new(config_dir: impl Into<PathBuf>) -> Self {
        Self {
            config_dir: config_dir.into(),
        }
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn ensure_dir(&self) -> anyhow::Result<()> {
        fs::create_dir_all(&self.config_dir)
            .with_context(|| format!("creating config dir {}", self.config_dir.display()))
    }

    /// Load every job file in the directory, disabled jobs included.
    /// A missing directory is an empty job set.
    pub fn load_all(&self) -> Vec<Job> {
        let entries = match fs::read_dir(&self.config_dir) {
            Ok(entries) => entries,
            Err(_) => return Vec::new(),
        };

        let mut jobs = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if !has_job_extension(&path) {
                continue;
            }

            match self.load_file(&path) {
                Ok(spec) => jobs.push(Job::new(spec)),
                Err(e) => {
                    warn!(file = %path.display(), error = %e, "skipping unloadable job file");
                }
            }
        }

        // Directory iteration order is filesystem-dependent.
        jobs.sort_by(|a, b| a.spec.job_name.cmp(&b.spec.job_name));
        jobs
    }

    pub fn load_file(&self, path: &Path) -> anyhow::Result<JobSpec> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading job file {}", path.display()))?;

        let spec: JobSpec = match extension(path) {
            "yaml" | "yml" => serde_yaml::from_str(&raw)
                .with_context(|| format!("parsing {}", path.display()))?,
            "json" => serde_json::from_str(&raw)
                .with_context(|| format!("parsing {}", path.display()))?,
            other => bail!("unsupported job file format: .{other}"),
        };

        Ok(spec)
    }

    /// Resolve a job name to its config file, trying extensions in order.
    pub fn find_job_file(&self, job_name: &str) -> Option<PathBuf> {
        JOB_EXTENSIONS.iter().find_map(|ext| {
            let path = self.config_dir.join(format!("{job_name}.{ext}"));
            path.exists().then_some(path)
        })
    }

    /// Write a spec back in the format its file name implies.
    pub fn save_spec(&self, spec: &JobSpec, path: &Path) -> anyhow::Result<()> {
        let serialized = match extension(path) {
            "yaml" | "yml" => serde_yaml::to_string(spec)?,
            "json" => serde_json::to_string_pretty(spec)?,
            other => bail!("unsupported job file format: .{other}"),
        };

        fs::write(path, serialized)
            .with_context(|| format!("writing job file {}", path.display()))
    }
}

fn extension(path: &Path) -> &str {
    path.extension().and_then(|e| e.to_str()).unwrap_or("")
}

fn has_job_extension(path: &Path) -> bool {
    JOB_EXTENSIONS.contains(&extension(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loader_with_file(name: &str, contents: &str) -> (tempfile::TempDir, JobLoader) {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(name), contents).unwrap();
        let loader = JobLoader::new(dir.path());
        (dir, loader)
    }

    #[test]
    fn yaml_job_with_defaults() {
        let (_dir, loader) = loader_with_file(
            "backup.yaml",
            "job_name: backup\ncommand: tar czf /tmp/b.tgz /home\n",
        );

        let jobs = loader.load_all();
        assert_eq!(jobs.len(), 1);

        let spec = &jobs[0].spec;
        assert_eq!(spec.job_name, "backup");
        assert!(spec.enabled);
        assert!(!spec.ai_aware);
        assert!(!spec.retry_on_fail);
        assert_eq!(spec.max_retries, 3);
        assert_eq!(spec.timeout_sec, None);
        assert!(spec.constraints().is_empty());
    }

    #[test]
    fn json_job_with_constraints() {
        let (_dir, loader) = loader_with_file(
            "compile.json",
            r#"{
                "job_name": "compile",
                "command": "make -j4",
                "max_cpu_percent": 50,
                "min_idle_time_sec": 120,
                "timeout_sec": 3600,
                "ai_aware": true
            }"#,
        );

        let jobs = loader.load_all();
        assert_eq!(jobs.len(), 1);

        let spec = &jobs[0].spec;
        assert_eq!(spec.max_cpu_percent, Some(50.0));
        assert_eq!(spec.min_idle_time_sec, Some(120));
        assert_eq!(spec.timeout_sec, Some(3600));
        assert!(spec.ai_aware);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let (_dir, loader) = loader_with_file(
            "typo.yaml",
            "job_name: typo\ncommand: echo hi\nmax_cpu: 50\n",
        );

        assert!(loader.load_all().is_empty());
    }

    #[test]
    fn bad_file_does_not_poison_the_set() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("good.yaml"), "job_name: good\ncommand: echo hi\n").unwrap();
        fs::write(dir.path().join("bad.yaml"), "command only, no name\n").unwrap();
        fs::write(dir.path().join("notes.txt"), "not a job\n").unwrap();

        let jobs = JobLoader::new(dir.path()).load_all();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].name(), "good");
    }

    #[test]
    fn disabled_jobs_still_load() {
        let (_dir, loader) = loader_with_file(
            "paused.yaml",
            "job_name: paused\ncommand: echo hi\nenabled: false\n",
        );

        let jobs = loader.load_all();
        assert_eq!(jobs.len(), 1);
        assert!(!jobs[0].spec.enabled);
    }

    #[test]
    fn missing_dir_is_empty_set() {
        let loader = JobLoader::new("/nonexistent/smartcron-test-jobs");
        assert!(loader.load_all().is_empty());
    }

    #[test]
    fn save_then_load_round_trips() {
        let (_dir, loader) = loader_with_file(
            "full.yaml",
            "job_name: full\n\
             command: rsync -a /src /dst\n\
             enabled: false\n\
             preferred_time: [\"03:00\", \"04:00\"]\n\
             max_cpu_percent: 70\n\
             min_battery_percent: 30\n\
             retry_on_fail: true\n\
             max_retries: 2\n\
             timeout_sec: 600\n\
             schedule_window_start: \"22:00\"\n\
             schedule_window_end: \"06:00\"\n",
        );

        let path = loader.find_job_file("full").unwrap();
        let original = loader.load_file(&path).unwrap();

        loader.save_spec(&original, &path).unwrap();
        let reloaded = loader.load_file(&path).unwrap();

        assert_eq!(original, reloaded);
    }

    #[test]
    fn find_job_file_tries_extensions_in_order() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.yml"), "job_name: a\ncommand: echo\n").unwrap();
        fs::write(dir.path().join("a.json"), "{}").unwrap();

        let loader = JobLoader::new(dir.path());
        let found = loader.find_job_file("a").unwrap();
        assert_eq!(found.extension().unwrap(), "yml");

        assert!(loader.find_job_file("missing").is_none());
    }
}
