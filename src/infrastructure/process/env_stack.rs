use regex::Regex;
use std::collections::{BTreeMap, HashMap};

/// Snapshot of prior overlay values for one `push`, used to revert the
/// changes made for one project's build.
#[derive(Debug, Clone)]
pub struct EnvFrame {
    /// (name, previous overlay value; None = absent before the push)
    saved: Vec<(String, Option<String>)>,
}

impl EnvFrame {
    fn new() -> Self {
        Self { saved: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.saved.len()
    }

    pub fn is_empty(&self) -> bool {
        self.saved.is_empty()
    }
}

/// LIFO stack of environment overrides over an immutable baseline.
///
/// The process-global environment is never touched: the baseline is
/// captured once (normally from `std::env::vars`), pushes mutate only the
/// overlay, and child processes receive baseline + overlay explicitly.
/// After `pop_all` the effective environment equals the baseline again.
#[derive(Debug, Clone)]
pub struct EnvironmentStack {
    baseline: HashMap<String, String>,
    overlay: HashMap<String, String>,
    frames: Vec<EnvFrame>,
}

impl EnvironmentStack {
    pub fn new(baseline: HashMap<String, String>) -> Self {
        Self {
            baseline,
            overlay: HashMap::new(),
            frames: Vec::new(),
        }
    }

    /// Capture the calling process environment as the baseline.
    pub fn from_process_env() -> Self {
        Self::new(std::env::vars().collect())
    }

    /// Effective value of `name`: overlay first, then baseline.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.overlay
            .get(name)
            .or_else(|| self.baseline.get(name))
            .map(String::as_str)
    }

    /// Baseline + overlay merged, the environment a child process sees.
    pub fn effective(&self) -> HashMap<String, String> {
        let mut env = self.baseline.clone();
        for (name, value) in &self.overlay {
            env.insert(name.clone(), value.clone());
        }
        env
    }

    /// Number of frames currently pushed.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Push one frame of variables.
    ///
    /// Each value may reference the variable's own prior value through
    /// `$NAME` or `${NAME}` placeholders, which allows path-like
    /// accumulation (`PERL5LIB: "lib:$PERL5LIB"`). Prior values are
    /// captured so `pop_all` restores them exactly.
    pub fn push(&mut self, vars: &BTreeMap<String, String>) {
        let mut frame = EnvFrame::new();
        for (name, value) in vars {
            let previous = self.get(name).unwrap_or("").to_string();
            let effective = substitute_self(value, name, &previous);
            frame
                .saved
                .push((name.clone(), self.overlay.get(name).cloned()));
            self.overlay.insert(name.clone(), effective);
        }
        self.frames.push(frame);
    }

    /// Unwind every frame in exact reverse push order.
    ///
    /// Must be called even when the work between push and pop failed;
    /// the orchestrator's cleaning step does so unconditionally.
    pub fn pop_all(&mut self) {
        while let Some(frame) = self.frames.pop() {
            for (name, previous) in frame.saved.into_iter().rev() {
                match previous {
                    Some(value) => {
                        self.overlay.insert(name, value);
                    }
                    None => {
                        self.overlay.remove(&name);
                    }
                }
            }
        }
    }
}

/// Replace `$NAME` / `${NAME}` (the variable's own name only) with the
/// prior value.
fn substitute_self(value: &str, name: &str, previous: &str) -> String {
    let escaped = regex::escape(name);
    let pattern = format!(r"\$\{{{escaped}\}}|\${escaped}\b");
    match Regex::new(&pattern) {
        Ok(re) => re
            .replace_all(value, regex::NoExpand(previous))
            .into_owned(),
        Err(_) => value.to_string(),
    }
}
