//! Daily schedule synthesis.
//!
//! Turns a wake/sleep window, fixed commitments, ready frontier nodes and
//! habits into a list of blocks that tiles the window exactly:
//!
//! 1. Resolve the window once (sleep at or before wake is next-day).
//! 2. Place meals and other commitments at their configured times.
//! 3. Cut every free interval into slots (15 minutes, shorter at the edge of
//!    an interval so nothing is left uncovered).
//! 4. Place high-magnitude nodes inside the high-energy windows, then the
//!    rest in frontier order.
//! 5. Place up to two habits near the morning and evening anchors.
//! 6. Fill leftovers with transitions, every third one a short break.

use chrono::{NaiveDate, Utc};
use tracing::{debug, warn};

use super::{BlockType, DailySchedule, FocusType, TimeBlock};
use crate::error::{InputError, Result};
use crate::frontier::FrontierNode;
use crate::project::ProjectConfig;
use crate::time::{self, Minutes, MINUTES_PER_DAY};

/// Tunables for schedule synthesis.
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesizerConfig {
    pub slot_minutes: Minutes,
    pub meal_minutes: Minutes,
    /// Length of the high-energy window that opens at wake
    pub high_energy_minutes_after_wake: Minutes,
    /// Start of the mid-afternoon high-energy window
    pub afternoon_window_start: Minutes,
    pub afternoon_window_minutes: Minutes,
    pub high_magnitude_threshold: u8,
    /// Morning habit anchor, minutes after wake
    pub habit_morning_offset: Minutes,
    /// Evening habit anchor, minutes before sleep
    pub habit_evening_offset: Minutes,
    pub habit_tolerance_minutes: Minutes,
    pub break_minutes: Minutes,
    pub deep_focus_minutes: Minutes,
    pub light_focus_minutes: Minutes,
}

impl Default for SynthesizerConfig {
    fn default() -> Self {
        Self {
            slot_minutes: 15,
            meal_minutes: 30,
            high_energy_minutes_after_wake: 180,
            afternoon_window_start: 14 * 60,
            afternoon_window_minutes: 120,
            high_magnitude_threshold: 7,
            habit_morning_offset: 30,
            habit_evening_offset: 60,
            habit_tolerance_minutes: 30,
            break_minutes: 10,
            deep_focus_minutes: 90,
            light_focus_minutes: 30,
        }
    }
}

/// Inputs for one synthesis run.
#[derive(Debug, Clone)]
pub struct ScheduleRequest<'a> {
    pub project: &'a ProjectConfig,
    pub ready_nodes: &'a [FrontierNode],
    pub habit_nodes: &'a [FrontierNode],
    pub date: NaiveDate,
    /// Self-reported energy, 1-5
    pub energy_level: u8,
    pub focus_type: FocusType,
}

#[derive(Debug, Clone, Copy)]
struct Slot {
    start: Minutes,
    len: Minutes,
    assigned: bool,
}

impl Slot {
    fn end(&self) -> Minutes {
        self.start + self.len
    }
}

/// Half-open interval of absolute minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Interval {
    start: Minutes,
    end: Minutes,
}

impl Interval {
    fn contains_span(&self, start: Minutes, end: Minutes) -> bool {
        start >= self.start && end <= self.end
    }

    fn overlaps(&self, start: Minutes, end: Minutes) -> bool {
        self.start < end && self.end > start
    }
}

/// Builds gap-free daily schedules.
pub struct ScheduleSynthesizer {
    config: SynthesizerConfig,
}

impl ScheduleSynthesizer {
    pub fn new() -> Self {
        Self {
            config: SynthesizerConfig::default(),
        }
    }

    pub fn with_config(config: SynthesizerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SynthesizerConfig {
        &self.config
    }

    /// Generate the schedule for one day.
    ///
    /// # Errors
    /// `InputError` when wake/sleep are missing or unparsable, or the energy
    /// level is outside 1-5. Excess nodes are reported in
    /// [`DailySchedule::unscheduled`], not as errors.
    pub fn synthesize(&self, request: &ScheduleRequest<'_>) -> Result<DailySchedule> {
        if !(1..=5).contains(&request.energy_level) {
            return Err(InputError::InvalidValue {
                field: "energy_level".into(),
                message: format!("expected 1-5, got {}", request.energy_level),
            }
            .into());
        }

        let (wake, sleep) = request.project.wake_sleep_minutes()?;
        let end = time::resolve_window(wake, sleep);
        let window = Interval { start: wake, end };
        debug!(wake, end, date = %request.date, "synthesizing schedule");

        let fixed = self.place_fixed_blocks(request.project, window);
        let mut slots = self.build_slots(window, &fixed);

        let zones = self.high_energy_zones(window);
        let block_cap = self.focus_cap(request.project, request.focus_type, request.energy_level);

        let mut blocks = fixed;
        let mut unscheduled = Vec::new();

        let (high, rest): (Vec<&FrontierNode>, Vec<&FrontierNode>) = request
            .ready_nodes
            .iter()
            .filter(|n| n.is_ready())
            .partition(|n| n.magnitude >= self.config.high_magnitude_threshold);

        let mut overflow = Vec::new();
        for node in high {
            let needed = self.block_minutes(node, block_cap);
            match find_run(&slots, needed, |start, end| {
                zones.iter().any(|z| z.contains_span(start, end))
            }) {
                Some(run) => blocks.push(learning_block(node, claim(&mut slots, run))),
                None => overflow.push(node),
            }
        }

        for node in rest.into_iter().chain(overflow) {
            let needed = self.block_minutes(node, block_cap);
            match find_run(&slots, needed, |_, _| true) {
                Some(run) => blocks.push(learning_block(node, claim(&mut slots, run))),
                None => {
                    debug!(node = %node.id, needed, "no room left for node today");
                    unscheduled.push(node.id.clone());
                }
            }
        }

        self.place_habits(request.habit_nodes, window, &mut slots, &mut blocks);
        blocks.extend(self.fill_remaining(&slots));

        blocks.sort_by_key(|b| b.start_minute);

        let mut schedule = DailySchedule {
            date: request.date,
            wake_minute: wake,
            end_minute: end,
            energy_level: request.energy_level,
            focus_type: request.focus_type,
            blocks,
            total_blocks: 0,
            completed: 0,
            unscheduled,
            generated_at: Utc::now(),
        };
        schedule.refresh_counts();
        Ok(schedule)
    }

    /// Meals and commitments that fit inside the window without colliding.
    fn place_fixed_blocks(&self, project: &ProjectConfig, window: Interval) -> Vec<TimeBlock> {
        let meals = project
            .meal_times
            .iter()
            .map(|t| (BlockType::Meal, None, t.as_str(), self.config.meal_minutes));
        let commitments = project.commitments.iter().map(|c| {
            (
                BlockType::LifeStructure,
                Some(c.title.as_str()),
                c.start.as_str(),
                c.duration_minutes,
            )
        });

        let mut placed: Vec<TimeBlock> = Vec::new();
        for (block_type, title, text, duration) in meals.chain(commitments) {
            let minute = match time::parse_time(text) {
                Ok(m) => m,
                Err(err) => {
                    warn!(time = text, error = %err, "skipping fixed block with unparsable time");
                    continue;
                }
            };
            let start = if minute < window.start {
                minute + MINUTES_PER_DAY
            } else {
                minute
            };
            let end = match start.checked_add(duration) {
                Some(end) if duration > 0 && window.contains_span(start, end) => end,
                _ => {
                    warn!(time = text, duration, "fixed block falls outside the wake window, skipping");
                    continue;
                }
            };
            if placed
                .iter()
                .any(|b| b.start_minute < end && b.end_minute() > start)
            {
                warn!(time = text, "fixed block overlaps an earlier one, skipping");
                continue;
            }

            let title = title.map(str::to_string).unwrap_or_else(|| meal_name(minute).to_string());
            let mut block = TimeBlock::new(block_type, title, start, duration);
            block.description = match block_type {
                BlockType::Meal => "Fixed meal time".to_string(),
                _ => "Fixed commitment".to_string(),
            };
            placed.push(block);
        }

        placed.sort_by_key(|b| b.start_minute);
        placed
    }

    /// Tile every free interval between fixed blocks with slots.
    fn build_slots(&self, window: Interval, fixed: &[TimeBlock]) -> Vec<Slot> {
        let mut slots = Vec::new();
        let mut cursor = window.start;
        let boundaries = fixed
            .iter()
            .map(|b| (b.start_minute, b.end_minute()))
            .chain(std::iter::once((window.end, window.end)));

        for (busy_start, busy_end) in boundaries {
            while cursor < busy_start {
                let len = self.config.slot_minutes.max(1).min(busy_start - cursor);
                slots.push(Slot {
                    start: cursor,
                    len,
                    assigned: false,
                });
                cursor += len;
            }
            cursor = cursor.max(busy_end);
        }
        slots
    }

    fn high_energy_zones(&self, window: Interval) -> Vec<Interval> {
        let morning = Interval {
            start: window.start,
            end: (window.start + self.config.high_energy_minutes_after_wake).min(window.end),
        };

        let mut afternoon_start = self.config.afternoon_window_start;
        if afternoon_start < window.start {
            afternoon_start += MINUTES_PER_DAY;
        }
        let afternoon = Interval {
            start: afternoon_start,
            end: afternoon_start + self.config.afternoon_window_minutes,
        };

        let mut zones = vec![morning];
        if window.overlaps(afternoon.start, afternoon.end) {
            zones.push(Interval {
                start: afternoon.start.max(window.start),
                end: afternoon.end.min(window.end),
            });
        }
        zones
    }

    /// Longest learning block allowed today.
    fn focus_cap(&self, project: &ProjectConfig, focus_type: FocusType, energy_level: u8) -> Minutes {
        let preferred = time::parse_duration(&project.focus_duration)
            .map(|d| d.minutes)
            .unwrap_or_else(|err| {
                warn!(focus_duration = %project.focus_duration, error = %err, "unparsable focus duration");
                25
            })
            .max(1);

        let cap = match focus_type {
            FocusType::Deep => preferred.max(self.config.deep_focus_minutes),
            FocusType::Balanced => preferred,
            FocusType::Light => preferred.min(self.config.light_focus_minutes),
        };
        if energy_level <= 2 {
            cap.min(self.config.light_focus_minutes)
        } else {
            cap
        }
    }

    fn block_minutes(&self, node: &FrontierNode, cap: Minutes) -> Minutes {
        let estimate = match time::parse_duration(&node.estimated_time) {
            Ok(d) => d.minutes,
            Err(err) => {
                debug!(node = %node.id, error = %err, "unparsable estimate, using focus cap");
                cap
            }
        };
        estimate.min(cap).max(1)
    }

    fn place_habits(
        &self,
        habits: &[FrontierNode],
        window: Interval,
        slots: &mut [Slot],
        blocks: &mut Vec<TimeBlock>,
    ) {
        let anchors = [
            window.start + self.config.habit_morning_offset,
            window.end.saturating_sub(self.config.habit_evening_offset),
        ];

        for (habit, anchor) in habits.iter().zip(anchors) {
            let nearest = slots
                .iter()
                .enumerate()
                .filter(|(_, s)| !s.assigned)
                .map(|(i, s)| (i, s.start.abs_diff(anchor)))
                .filter(|(_, distance)| *distance <= self.config.habit_tolerance_minutes)
                .min_by_key(|(_, distance)| *distance);

            match nearest {
                Some((index, _)) => {
                    let slot = &mut slots[index];
                    slot.assigned = true;
                    let mut block = TimeBlock::new(BlockType::Habit, habit.title.clone(), slot.start, slot.len);
                    block.id = habit.id.clone();
                    block.description = habit.description.clone();
                    block.strategic_purpose = Some(habit.branch_type.to_string());
                    blocks.push(block);
                }
                None => debug!(habit = %habit.title, anchor, "no free slot near habit anchor"),
            }
        }
    }

    /// Transitions for every unassigned slot; every third becomes a break
    /// whose leftover minutes roll into the following transition.
    fn fill_remaining(&self, slots: &[Slot]) -> Vec<TimeBlock> {
        let mut blocks = Vec::new();
        let mut carry_start: Option<Minutes> = None;
        let mut remaining_index = 0usize;

        for (i, slot) in slots.iter().enumerate() {
            if slot.assigned {
                continue;
            }
            let start = carry_start.take().unwrap_or(slot.start);
            let next_absorbs = slots
                .get(i + 1)
                .is_some_and(|next| !next.assigned && next.start == slot.end());

            if remaining_index % 3 == 2 && next_absorbs && slot.end() - start > self.config.break_minutes {
                let mut block = TimeBlock::new(BlockType::Break, "Break", start, self.config.break_minutes);
                block.description = "Step away and rest".to_string();
                blocks.push(block);
                carry_start = Some(start + self.config.break_minutes);
            } else {
                let mut block = TimeBlock::new(BlockType::Transition, "Transition", start, slot.end() - start);
                block.description = "Buffer time".to_string();
                blocks.push(block);
            }
            remaining_index += 1;
        }
        blocks
    }
}

impl Default for ScheduleSynthesizer {
    fn default() -> Self {
        Self::new()
    }
}

/// First run of contiguous free slots covering `needed` minutes whose span
/// satisfies `accept`. Returns the slot index range.
fn find_run<F>(slots: &[Slot], needed: Minutes, accept: F) -> Option<std::ops::Range<usize>>
where
    F: Fn(Minutes, Minutes) -> bool,
{
    for first in 0..slots.len() {
        if slots[first].assigned {
            continue;
        }
        let mut covered = 0;
        let mut last = first;
        while last < slots.len() {
            let slot = slots[last];
            if slot.assigned || (last > first && slot.start != slots[last - 1].end()) {
                break;
            }
            covered += slot.len;
            if covered >= needed {
                if accept(slots[first].start, slot.end()) {
                    return Some(first..last + 1);
                }
                break;
            }
            last += 1;
        }
    }
    None
}

/// Mark a run as used and return its (start, length).
fn claim(slots: &mut [Slot], run: std::ops::Range<usize>) -> (Minutes, Minutes) {
    let start = slots[run.start].start;
    let mut len = 0;
    for slot in &mut slots[run] {
        slot.assigned = true;
        len += slot.len;
    }
    (start, len)
}

fn learning_block(node: &FrontierNode, (start, len): (Minutes, Minutes)) -> TimeBlock {
    let mut block = TimeBlock::new(BlockType::Learning, node.title.clone(), start, len);
    block.id = node.id.clone();
    block.duration = node.estimated_time.clone();
    block.description = node.description.clone();
    block.strategic_purpose = Some(node.branch_type.to_string());
    block.learning_outcomes = node.learning_outcomes.clone();
    block.magnitude = Some(node.magnitude);
    block
}

fn meal_name(minute: Minutes) -> &'static str {
    match minute {
        m if m < 11 * 60 => "Breakfast",
        m if m < 16 * 60 => "Lunch",
        _ => "Dinner",
    }
}
