//! Engine-side timeline: lanes of beat-positioned blocks, each optionally driven by a timeline
//! script, plus a master script for the whole timeline.

use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_TICKS_PER_BEAT: u32 = 128;
pub const DEFAULT_BEATS_PER_MINUTE: f32 = 138.0;
pub const DEFAULT_NUM_BEATS: u32 = 128;
pub const BEATS_PER_MINUTE_RANGE: (f32, f32) = (30.0, 500.0);
pub const MIN_TICKS_PER_BEAT: u32 = 16;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimelineError {
    #[error("no block with guid {0}")]
    UnknownBlock(u32),
    #[error("no lane {0}")]
    UnknownLane(usize),
    #[error("a timeline needs at least one beat")]
    NoBeats,
    #[error("block overlaps another block of lane {0}")]
    Overlap(usize),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub guid: u32,
    pub name: String,
    pub class_name: String,
    pub beat: u32,
    pub duration: u32,
    pub script: Option<PathBuf>,
}

impl Block {
    fn end(&self) -> u32 {
        self.beat.saturating_add(self.duration)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Lane {
    pub name: String,
    pub blocks: Vec<Block>,
}

/// Settable timeline properties. Values out of range are corrected, not rejected, except a
/// zero beat count.
#[derive(Debug, Clone, PartialEq)]
pub enum TimelineParameter {
    BeatsPerMinute(f32),
    NumBeats(u32),
    TicksPerBeat(u32),
    LaneName { lane: usize, name: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Timeline {
    pub beats_per_minute: f32,
    pub num_beats: u32,
    pub ticks_per_beat: u32,
    pub master_script: Option<PathBuf>,
    pub lanes: Vec<Lane>,
    next_guid: u32,
}

impl Default for Timeline {
    fn default() -> Self {
        Self {
            beats_per_minute: DEFAULT_BEATS_PER_MINUTE,
            num_beats: DEFAULT_NUM_BEATS,
            ticks_per_beat: DEFAULT_TICKS_PER_BEAT,
            master_script: None,
            lanes: vec![Lane { name: "Lane 0".into(), blocks: Vec::new() }],
            next_guid: 1,
        }
    }
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_lane(&mut self) -> usize {
        let index = self.lanes.len();
        self.lanes.push(Lane { name: format!("Lane {index}"), blocks: Vec::new() });
        index
    }

    /// Places a new block; blocks of one lane never overlap. Returns the block guid.
    pub fn add_block(
        &mut self,
        lane: usize,
        name: &str,
        class_name: &str,
        beat: u32,
        duration: u32,
    ) -> Result<u32, TimelineError> {
        let target = self.lanes.get_mut(lane).ok_or(TimelineError::UnknownLane(lane))?;
        let end = beat.saturating_add(duration.max(1));
        if target.blocks.iter().any(|block| beat < block.end() && block.beat < end) {
            return Err(TimelineError::Overlap(lane));
        }
        let guid = self.next_guid;
        self.next_guid += 1;
        target.blocks.push(Block {
            guid,
            name: name.to_string(),
            class_name: class_name.to_string(),
            beat,
            duration: duration.max(1),
            script: None,
        });
        target.blocks.sort_by_key(|block| block.beat);
        Ok(guid)
    }

    pub fn block(&self, guid: u32) -> Option<&Block> {
        self.lanes.iter().flat_map(|lane| lane.blocks.iter()).find(|block| block.guid == guid)
    }

    fn block_mut(&mut self, guid: u32) -> Result<&mut Block, TimelineError> {
        self.lanes
            .iter_mut()
            .flat_map(|lane| lane.blocks.iter_mut())
            .find(|block| block.guid == guid)
            .ok_or(TimelineError::UnknownBlock(guid))
    }

    pub fn set_block_script(&mut self, guid: u32, script: &Path) -> Result<(), TimelineError> {
        self.block_mut(guid)?.script = Some(script.to_path_buf());
        Ok(())
    }

    /// Returns the script that was attached, if any.
    pub fn clear_block_script(&mut self, guid: u32) -> Result<Option<PathBuf>, TimelineError> {
        Ok(self.block_mut(guid)?.script.take())
    }

    pub fn set_master_script(&mut self, script: &Path) {
        self.master_script = Some(script.to_path_buf());
    }

    pub fn clear_master_script(&mut self) -> Option<PathBuf> {
        self.master_script.take()
    }

    /// Applies a parameter. Returns the value actually stored when it had to be corrected.
    pub fn set_parameter(&mut self, parameter: TimelineParameter) -> Result<Option<String>, TimelineError> {
        match parameter {
            TimelineParameter::BeatsPerMinute(bpm) => {
                let (min, max) = BEATS_PER_MINUTE_RANGE;
                let stored = if bpm.is_nan() { DEFAULT_BEATS_PER_MINUTE } else { bpm.clamp(min, max) };
                self.beats_per_minute = stored;
                Ok((stored != bpm).then(|| format!("{stored:.2} BPM")))
            }
            TimelineParameter::NumBeats(0) => Err(TimelineError::NoBeats),
            TimelineParameter::NumBeats(beats) => {
                self.num_beats = beats;
                Ok(None)
            }
            TimelineParameter::TicksPerBeat(ticks) => {
                let stored = ticks.max(MIN_TICKS_PER_BEAT).next_power_of_two();
                self.ticks_per_beat = stored;
                Ok((stored != ticks).then(|| format!("{stored} ticks per beat")))
            }
            TimelineParameter::LaneName { lane, name } => {
                self.lanes.get_mut(lane).ok_or(TimelineError::UnknownLane(lane))?.name = name;
                Ok(None)
            }
        }
    }

    /// Every script the timeline refers to, master first.
    pub fn scripts(&self) -> impl Iterator<Item = &Path> + '_ {
        self.master_script
            .as_deref()
            .into_iter()
            .chain(self.lanes.iter().flat_map(|lane| lane.blocks.iter()).filter_map(|block| block.script.as_deref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_with_one_lane_and_default_tempo() {
        let timeline = Timeline::new();
        assert_eq!(timeline.lanes.len(), 1);
        assert_eq!(timeline.beats_per_minute, 138.0);
        assert_eq!(timeline.ticks_per_beat, 128);
        assert_eq!(timeline.num_beats, 128);
    }

    #[test]
    fn blocks_in_a_lane_do_not_overlap() {
        let mut timeline = Timeline::new();
        let first = timeline.add_block(0, "intro", "Fade", 0, 4).expect("first");
        assert_eq!(timeline.add_block(0, "clash", "Fade", 3, 2), Err(TimelineError::Overlap(0)));
        let second = timeline.add_block(0, "main", "Scene", 4, 8).expect("adjacent");
        assert_ne!(first, second);
        assert_eq!(timeline.add_block(3, "nowhere", "Fade", 0, 1), Err(TimelineError::UnknownLane(3)));
        let lane = timeline.add_lane();
        assert!(timeline.add_block(lane, "overlay", "Text", 2, 4).is_ok());
    }

    #[test]
    fn scripts_attach_and_detach() {
        let mut timeline = Timeline::new();
        let guid = timeline.add_block(0, "intro", "Fade", 0, 4).expect("block");
        timeline.set_block_script(guid, Path::new("intro.bs")).expect("attach");
        timeline.set_master_script(Path::new("master.bs"));
        assert_eq!(
            timeline.scripts().collect::<Vec<_>>(),
            vec![Path::new("master.bs"), Path::new("intro.bs")]
        );
        assert_eq!(timeline.clear_block_script(guid), Ok(Some(PathBuf::from("intro.bs"))));
        assert_eq!(timeline.clear_block_script(99), Err(TimelineError::UnknownBlock(99)));
        assert_eq!(timeline.clear_master_script(), Some(PathBuf::from("master.bs")));
        assert_eq!(timeline.scripts().count(), 0);
    }

    #[test]
    fn parameters_are_corrected_into_range() {
        let mut timeline = Timeline::new();
        assert_eq!(timeline.set_parameter(TimelineParameter::BeatsPerMinute(900.0)), Ok(Some("500.00 BPM".into())));
        assert_eq!(timeline.beats_per_minute, 500.0);
        assert_eq!(timeline.set_parameter(TimelineParameter::BeatsPerMinute(120.0)), Ok(None));
        assert_eq!(timeline.set_parameter(TimelineParameter::TicksPerBeat(100)), Ok(Some("128 ticks per beat".into())));
        assert_eq!(timeline.set_parameter(TimelineParameter::TicksPerBeat(4)), Ok(Some("16 ticks per beat".into())));
        assert_eq!(timeline.set_parameter(TimelineParameter::NumBeats(0)), Err(TimelineError::NoBeats));
        assert_eq!(timeline.num_beats, 128);
        timeline
            .set_parameter(TimelineParameter::LaneName { lane: 0, name: "Camera".into() })
            .expect("rename");
        assert_eq!(timeline.lanes[0].name, "Camera");
    }
}
