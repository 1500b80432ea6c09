//! Toast notifications: short status lines stamped over the visualization.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use wavetty_core::{ColorTier, FrameGrid};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

impl Severity {
    fn tier(self) -> ColorTier {
        match self {
            Severity::Info => ColorTier::White,
            Severity::Success => ColorTier::Green,
            Severity::Warning => ColorTier::Yellow,
            Severity::Error => ColorTier::Red,
        }
    }
}

struct Toast {
    message: String,
    severity: Severity,
    expires: Instant,
}

pub struct ToastManager {
    toasts: VecDeque<Toast>,
    max_visible: usize,
    enabled: bool,
}

impl ToastManager {
    pub fn new(enabled: bool) -> Self {
        Self {
            toasts: VecDeque::new(),
            max_visible: 2,
            enabled,
        }
    }

    pub fn push(&mut self, message: impl Into<String>, severity: Severity, duration: Duration) {
        self.push_at(message, severity, duration, Instant::now());
    }

    fn push_at(&mut self, message: impl Into<String>, severity: Severity, duration: Duration, now: Instant) {
        if !self.enabled {
            return;
        }
        let msg = message.into();
        self.toasts.retain(|t| t.message != msg);
        self.toasts.push_back(Toast {
            message: msg,
            severity,
            expires: now + duration,
        });
        while self.toasts.len() > self.max_visible {
            self.toasts.pop_front();
        }
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.push(message, Severity::Info, Duration::from_millis(1500));
    }

    pub fn success(&mut self, message: impl Into<String>) {
        self.push(message, Severity::Success, Duration::from_secs(2));
    }

    pub fn warning(&mut self, message: impl Into<String>) {
        self.push(message, Severity::Warning, Duration::from_secs(3));
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.push(message, Severity::Error, Duration::from_secs(4));
    }

    /// Drop expired toasts. Call each tick.
    pub fn tick(&mut self, now: Instant) {
        self.toasts.retain(|t| t.expires > now);
    }

    pub fn is_empty(&self) -> bool {
        self.toasts.is_empty()
    }

    /// Paint the live toasts onto the top-right corner of `grid`, newest
    /// first, over whatever the mode drew there.
    pub fn stamp(&self, grid: &mut FrameGrid) {
        if self.is_empty() {
            return;
        }
        let width = grid.width() as i32;
        for (row, toast) in self.toasts.iter().rev().enumerate() {
            if row as u16 >= grid.height() {
                break;
            }
            let text = format!(" {} ", toast.message);
            let len = text.chars().count() as i32;
            let x = (width - len - 1).max(0);
            grid.put_str(x, row as i32, &text, toast.severity.tier());
        }
    }
}
