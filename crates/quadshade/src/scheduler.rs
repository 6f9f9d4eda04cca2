//! Visibility-gated frame scheduling.
//!
//! The scheduler never runs frames itself; it decides whether a frame may run
//! and keeps exactly one frame request outstanding with the host while the
//! drawable is visible.

use crate::time::HostClock;

/// Host services the frame loop depends on.
///
/// The host delivers two kinds of events on the engine's thread:
/// a requested frame firing (`QuadShader::on_frame`) and a visibility change
/// (`QuadShader::set_visible`).
pub trait FrameHost {
    /// Asks for one `on_frame` call at the host's next frame.
    fn request_next_frame(&mut self);

    /// Clock backing the `uTime` uniform.
    fn clock(&self) -> HostClock;

    /// Starts delivering visibility changes for the drawable.
    fn observe_visibility(&mut self) {}

    /// Stops delivering visibility changes for the drawable.
    fn unobserve_visibility(&mut self) {}
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SchedulerState {
    Stopped,
    Running,
}

/// Outcome of a visibility change.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Transition {
    /// Stopped → Running; the caller runs one frame right away.
    Started,
    /// Running → Stopped.
    Stopped,
    /// No state change.
    Unchanged,
}

/// What triggered a frame.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum FrameTrigger {
    /// Synchronous frame on becoming visible.
    Kickstart,
    /// A previously requested host frame fired.
    Callback,
}

#[derive(Debug)]
pub struct RenderScheduler {
    state: SchedulerState,
    frame_pending: bool,
    halted: bool,
    visible: bool,
}

impl Default for RenderScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderScheduler {
    pub fn new() -> Self {
        Self {
            state: SchedulerState::Stopped,
            frame_pending: false,
            halted: false,
            visible: false,
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == SchedulerState::Running
    }

    /// Whether a host frame has been requested and not yet delivered.
    pub fn frame_pending(&self) -> bool {
        self.frame_pending
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    /// Applies a visibility signal.
    ///
    /// Repeating the current visibility is a no-op. A halted scheduler ignores
    /// visibility until `resume`.
    pub fn visibility_changed(&mut self, visible: bool) -> Transition {
        self.visible = visible;
        match (self.state, visible) {
            (SchedulerState::Stopped, true) if !self.halted => {
                log::debug!("surface visible; frame loop started");
                self.state = SchedulerState::Running;
                Transition::Started
            }
            (SchedulerState::Running, false) => {
                log::debug!("surface hidden; frame loop stopped");
                self.state = SchedulerState::Stopped;
                Transition::Stopped
            }
            _ => Transition::Unchanged,
        }
    }

    /// Gate at the top of every frame.
    ///
    /// Returns `false` when stopped: a stale callback then ends without
    /// requesting another frame, which is how the loop terminates. When
    /// running, the next frame is requested before returning `true` so it
    /// stays queued even if the frame body fails.
    pub fn begin_frame<H: FrameHost + ?Sized>(&mut self, trigger: FrameTrigger, host: &mut H) -> bool {
        if trigger == FrameTrigger::Callback {
            self.frame_pending = false;
        }

        if self.state == SchedulerState::Stopped {
            return false;
        }

        if !self.frame_pending {
            host.request_next_frame();
            self.frame_pending = true;
        }

        true
    }

    /// Stops the loop after a failed frame and ignores visibility until
    /// `resume`.
    pub fn halt(&mut self) {
        log::debug!("frame loop halted");
        self.state = SchedulerState::Stopped;
        self.halted = true;
    }

    /// Clears a halt. Restarts the loop if the drawable was last reported
    /// visible; otherwise it starts on the next visible signal.
    pub fn resume(&mut self) -> Transition {
        self.halted = false;
        if self.visible {
            self.visibility_changed(true)
        } else {
            Transition::Unchanged
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeHost;

    #[test]
    fn starts_stopped() {
        let scheduler = RenderScheduler::new();
        assert_eq!(scheduler.state(), SchedulerState::Stopped);
        assert!(!scheduler.frame_pending());
    }

    #[test]
    fn visibility_drives_transitions() {
        let mut scheduler = RenderScheduler::new();

        assert_eq!(scheduler.visibility_changed(false), Transition::Unchanged);
        assert_eq!(scheduler.visibility_changed(true), Transition::Started);
        assert_eq!(scheduler.visibility_changed(true), Transition::Unchanged);
        assert_eq!(scheduler.visibility_changed(false), Transition::Stopped);
        assert_eq!(scheduler.state(), SchedulerState::Stopped);
    }

    #[test]
    fn running_frame_requests_next_before_body() {
        let mut scheduler = RenderScheduler::new();
        let mut host = FakeHost::new();
        scheduler.visibility_changed(true);

        assert!(scheduler.begin_frame(FrameTrigger::Kickstart, &mut host));
        assert_eq!(host.requests(), 1);
        assert!(scheduler.frame_pending());

        assert!(scheduler.begin_frame(FrameTrigger::Callback, &mut host));
        assert_eq!(host.requests(), 2);
    }

    #[test]
    fn stale_callback_does_not_requeue() {
        let mut scheduler = RenderScheduler::new();
        let mut host = FakeHost::new();
        scheduler.visibility_changed(true);
        scheduler.begin_frame(FrameTrigger::Kickstart, &mut host);
        scheduler.visibility_changed(false);

        assert!(!scheduler.begin_frame(FrameTrigger::Callback, &mut host));
        assert_eq!(host.requests(), 1);
        assert!(!scheduler.frame_pending());
    }

    #[test]
    fn quick_hide_show_keeps_a_single_request_outstanding() {
        let mut scheduler = RenderScheduler::new();
        let mut host = FakeHost::new();
        scheduler.visibility_changed(true);
        scheduler.begin_frame(FrameTrigger::Kickstart, &mut host);

        scheduler.visibility_changed(false);
        assert_eq!(scheduler.visibility_changed(true), Transition::Started);

        // Kickstart frame runs, but the earlier request is still queued.
        assert!(scheduler.begin_frame(FrameTrigger::Kickstart, &mut host));
        assert_eq!(host.requests(), 1);

        // The queued callback continues the one loop.
        assert!(scheduler.begin_frame(FrameTrigger::Callback, &mut host));
        assert_eq!(host.requests(), 2);
    }

    #[test]
    fn halt_ignores_visibility_until_resumed() {
        let mut scheduler = RenderScheduler::new();
        scheduler.visibility_changed(true);
        scheduler.halt();

        assert_eq!(scheduler.state(), SchedulerState::Stopped);
        assert_eq!(scheduler.visibility_changed(true), Transition::Unchanged);

        assert_eq!(scheduler.resume(), Transition::Started);
        assert!(scheduler.is_running());
    }

    #[test]
    fn resume_while_hidden_waits_for_visibility() {
        let mut scheduler = RenderScheduler::new();
        scheduler.visibility_changed(true);
        scheduler.halt();
        scheduler.visibility_changed(false);

        assert_eq!(scheduler.resume(), Transition::Unchanged);
        assert_eq!(scheduler.visibility_changed(true), Transition::Started);
    }
}
