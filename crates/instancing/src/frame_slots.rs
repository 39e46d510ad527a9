//! Per-slot lifecycle tracking.
//!
//! ```text
//! Idle -> Acquiring -> Recording -> Submitted -> Idle
//! ```
//!
//! A slot leaves `Submitted` only once the device context has confirmed its
//! fence. Uniform and instance data of a slot may only be written while it
//! is `Recording`.

use crate::error::{RenderError, RenderResult};

/// Lifecycle state of one frame slot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SlotState {
    /// No submission reads the slot's resources.
    #[default]
    Idle,
    /// The slot was picked for the next frame; commands are not open yet.
    Acquiring,
    /// Commands are open and the CPU is writing the slot's resources.
    Recording,
    /// Submitted to the GPU and not yet fenced.
    Submitted,
}

/// States of every frame slot.
#[derive(Debug)]
pub struct FrameSlotTracker {
    states: Vec<SlotState>,
}

impl FrameSlotTracker {
    pub fn new(frames_in_flight: usize) -> Self {
        Self {
            states: vec![SlotState::Idle; frames_in_flight],
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.states.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// # Panics
    ///
    /// Panics if `slot` is out of range.
    pub fn state(&self, slot: usize) -> SlotState {
        *self.slot(slot)
    }

    pub fn begin_acquire(&mut self, slot: usize) -> RenderResult<()> {
        self.transition(slot, SlotState::Idle, SlotState::Acquiring)
    }

    pub fn begin_recording(&mut self, slot: usize) -> RenderResult<()> {
        self.transition(slot, SlotState::Acquiring, SlotState::Recording)
    }

    pub fn mark_submitted(&mut self, slot: usize) -> RenderResult<()> {
        self.transition(slot, SlotState::Recording, SlotState::Submitted)
    }

    /// Call only after the slot's fence has signaled.
    pub fn mark_retired(&mut self, slot: usize) -> RenderResult<()> {
        self.transition(slot, SlotState::Submitted, SlotState::Idle)
    }

    /// Fails unless `slot` is `Recording`.
    pub fn ensure_writable(&self, slot: usize) -> RenderResult<()> {
        match self.state(slot) {
            SlotState::Recording => Ok(()),
            state => Err(RenderError::SlotNotWritable { slot, state }),
        }
    }

    pub fn any_in_flight(&self) -> bool {
        self.states.contains(&SlotState::Submitted)
    }

    /// Retires every submitted slot. Call only after the device went idle.
    pub fn retire_all(&mut self) {
        for state in &mut self.states {
            if *state == SlotState::Submitted {
                *state = SlotState::Idle;
            }
        }
    }

    fn transition(&mut self, slot: usize, from: SlotState, to: SlotState) -> RenderResult<()> {
        let state = self.slot_mut(slot);
        if *state != from {
            return Err(RenderError::InvalidSlotTransition {
                slot,
                from: *state,
                to,
            });
        }
        *state = to;
        Ok(())
    }

    fn slot(&self, slot: usize) -> &SlotState {
        let frames = self.states.len();
        self.states
            .get(slot)
            .unwrap_or_else(|| panic!("frame slot {slot} out of range ({frames} frames in flight)"))
    }

    fn slot_mut(&mut self, slot: usize) -> &mut SlotState {
        let frames = self.states.len();
        self.states
            .get_mut(slot)
            .unwrap_or_else(|| panic!("frame slot {slot} out of range ({frames} frames in flight)"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_cycle() {
        let mut slots = FrameSlotTracker::new(2);

        slots.begin_acquire(0).unwrap();
        slots.begin_recording(0).unwrap();
        slots.ensure_writable(0).unwrap();
        slots.mark_submitted(0).unwrap();
        assert!(slots.any_in_flight());

        slots.mark_retired(0).unwrap();
        assert_eq!(slots.state(0), SlotState::Idle);
        assert!(!slots.any_in_flight());
    }

    #[test]
    fn test_cannot_record_a_submitted_slot() {
        let mut slots = FrameSlotTracker::new(1);
        slots.begin_acquire(0).unwrap();
        slots.begin_recording(0).unwrap();
        slots.mark_submitted(0).unwrap();

        let err = slots.begin_acquire(0).unwrap_err();
        assert!(matches!(
            err,
            RenderError::InvalidSlotTransition {
                slot: 0,
                from: SlotState::Submitted,
                to: SlotState::Acquiring,
            }
        ));
        assert!(slots.begin_recording(0).is_err());
        assert_eq!(slots.state(0), SlotState::Submitted);
    }

    #[test]
    fn test_recording_requires_acquiring() {
        let mut slots = FrameSlotTracker::new(1);
        assert!(slots.begin_recording(0).is_err());
        assert!(slots.mark_submitted(0).is_err());
        assert!(slots.mark_retired(0).is_err());
    }

    #[test]
    fn test_writes_only_while_recording() {
        let mut slots = FrameSlotTracker::new(1);
        assert!(matches!(
            slots.ensure_writable(0),
            Err(RenderError::SlotNotWritable {
                state: SlotState::Idle,
                ..
            })
        ));

        slots.begin_acquire(0).unwrap();
        assert!(slots.ensure_writable(0).is_err());
        slots.begin_recording(0).unwrap();
        assert!(slots.ensure_writable(0).is_ok());
        slots.mark_submitted(0).unwrap();
        assert!(slots.ensure_writable(0).is_err());
    }

    #[test]
    fn test_retire_all_leaves_other_states_alone() {
        let mut slots = FrameSlotTracker::new(3);
        for slot in 0..2 {
            slots.begin_acquire(slot).unwrap();
            slots.begin_recording(slot).unwrap();
            slots.mark_submitted(slot).unwrap();
        }
        slots.begin_acquire(2).unwrap();

        slots.retire_all();

        assert_eq!(slots.state(0), SlotState::Idle);
        assert_eq!(slots.state(1), SlotState::Idle);
        assert_eq!(slots.state(2), SlotState::Acquiring);
    }

    #[test]
    #[should_panic(expected = "frame slot 4 out of range")]
    fn test_out_of_range_slot_panics() {
        FrameSlotTracker::new(2).state(4);
    }
}
