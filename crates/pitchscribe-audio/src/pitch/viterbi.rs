//! Path decoding over per-frame pitch candidates.
//!
//! Each frame offers an unvoiced state plus zero or more voiced candidates.
//! Costs are additive: lower is better.

/// A candidate period expressed as a frequency.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub frequency: f64,
    /// Observation cost (normalized difference at the period).
    pub cost: f64,
}

/// Decoding input for one frame.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FrameCandidates {
    pub candidates: Vec<Candidate>,
    /// Observation cost of declaring the frame unvoiced.
    pub unvoiced_cost: f64,
}

/// Transition penalties between consecutive frames.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransitionCosts {
    /// Cost per octave of pitch movement between voiced frames.
    pub per_octave: f64,
    /// Cost of switching between voiced and unvoiced.
    pub voicing_switch: f64,
}

impl Default for TransitionCosts {
    fn default() -> Self {
        Self {
            per_octave: 0.35,
            voicing_switch: 0.1,
        }
    }
}

impl FrameCandidates {
    fn state_count(&self) -> usize {
        self.candidates.len() + 1
    }

    /// State 0 is unvoiced; state `k` is candidate `k - 1`.
    fn observation(&self, state: usize) -> f64 {
        if state == 0 {
            self.unvoiced_cost
        } else {
            self.candidates[state - 1].cost
        }
    }

    fn frequency(&self, state: usize) -> Option<f64> {
        if state == 0 {
            None
        } else {
            Some(self.candidates[state - 1].frequency)
        }
    }
}

fn transition(
    costs: &TransitionCosts,
    prev: &FrameCandidates,
    prev_state: usize,
    next: &FrameCandidates,
    next_state: usize,
) -> f64 {
    match (prev.frequency(prev_state), next.frequency(next_state)) {
        (None, None) => 0.0,
        (Some(a), Some(b)) => costs.per_octave * (b / a).log2().abs(),
        _ => costs.voicing_switch,
    }
}

/// Pick the lowest-cost state in each frame independently.
pub fn decode_argmax(frames: &[FrameCandidates]) -> Vec<Option<f64>> {
    frames
        .iter()
        .map(|frame| {
            let best = (0..frame.state_count())
                .min_by(|&a, &b| frame.observation(a).total_cmp(&frame.observation(b)))
                .unwrap_or(0);
            frame.frequency(best)
        })
        .collect()
}

/// Find the state sequence minimizing observation plus transition cost.
pub fn decode_viterbi(frames: &[FrameCandidates], costs: &TransitionCosts) -> Vec<Option<f64>> {
    let Some(first) = frames.first() else {
        return Vec::new();
    };

    let mut totals: Vec<f64> = (0..first.state_count())
        .map(|s| first.observation(s))
        .collect();
    let mut backpointers: Vec<Vec<usize>> = Vec::with_capacity(frames.len());
    backpointers.push(vec![0; first.state_count()]);

    for pair in frames.windows(2) {
        let (prev, next) = (&pair[0], &pair[1]);
        let mut next_totals = Vec::with_capacity(next.state_count());
        let mut pointers = Vec::with_capacity(next.state_count());

        for next_state in 0..next.state_count() {
            let (best_prev, best_total) = (0..prev.state_count())
                .map(|prev_state| {
                    let total = totals[prev_state]
                        + transition(costs, prev, prev_state, next, next_state);
                    (prev_state, total)
                })
                .min_by(|a, b| a.1.total_cmp(&b.1))
                .unwrap_or((0, 0.0));

            next_totals.push(best_total + next.observation(next_state));
            pointers.push(best_prev);
        }

        totals = next_totals;
        backpointers.push(pointers);
    }

    let mut state = (0..totals.len())
        .min_by(|&a, &b| totals[a].total_cmp(&totals[b]))
        .unwrap_or(0);
    let mut path = vec![0usize; frames.len()];
    for idx in (0..frames.len()).rev() {
        path[idx] = state;
        state = backpointers[idx][state];
    }

    path.iter()
        .zip(frames)
        .map(|(&state, frame)| frame.frequency(state))
        .collect()
}
