/// Adaptive score floor that bounds how many partial matches are kept.
///
/// Every positive score is offered. Once more than `fan_out` offers have
/// landed on the current floor, the next offer that is below the best score
/// seen (or is a single-byte match) raises the floor by one. Offers below
/// the floor are rejected.
///
/// The floor only ever rises and candidates admitted earlier are never
/// evicted, so the retained set is not the exact top-N.
#[derive(Debug, Clone)]
pub struct AdmissionPolicy {
    fan_out: usize,
    floor: usize,
    best: usize,
    at_floor: usize,
}

impl AdmissionPolicy {
    pub fn new(fan_out: usize) -> Self {
        Self {
            fan_out,
            floor: 0,
            best: 0,
            // saturated so the first sub-best offer lifts the floor off zero
            at_floor: usize::MAX,
        }
    }

    /// Offer a score; returns whether the candidate should be kept
    pub fn offer(&mut self, score: usize) -> bool {
        self.best = self.best.max(score);

        if score == self.floor {
            self.at_floor = self.at_floor.saturating_add(1);
        }

        if score >= self.floor
            && (score < self.best || score == 1)
            && self.at_floor > self.fan_out
        {
            self.floor += 1;
            self.at_floor = 0;
        }

        score >= self.floor
    }

    pub fn floor(&self) -> usize {
        self.floor
    }

    pub fn best(&self) -> usize {
        self.best
    }
}
