//! Branch predictors for the predictor variant. All three share a `predict`/`update`
//! contract and are selected at startup via [`PredictorKind`] — enum dispatch, not a
//! trait object, since the set of variants is closed.
//!
//! The underlying counters are a one-way ratchet, not a textbook bidirectional
//! saturating counter: a `taken` observation only ever advances states 0/1 upward
//! (`0->1->3`), and a `not-taken` observation only ever advances states 3/2 downward
//! (`3->2->0`). A transient state hit from the "wrong" direction just sits still.
//! States 0/1 predict not-taken; 2/3 predict taken.

const SATURATING_TABLE_SIZE: usize = 1 << 14;
const BHR_TABLE_SIZE: usize = 1 << 2;
const COMBINED_TABLE_SIZE: usize = 1 << 16;

/// Initial state for every counter in every table. The spec leaves this
/// unspecified; "weakly not-taken" is as good a cold-start guess as any.
const INITIAL_STATE: u8 = 1;

fn transition(state: u8, taken: bool) -> u8 {
    match (state, taken) {
        (0, true) => 1,
        (1, true) => 3,
        (3, false) => 2,
        (2, false) => 0,
        (other, _) => other,
    }
}

fn predicts_taken(state: u8) -> bool {
    state >= 2
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PredictorKind {
    Saturating,
    Bhr,
    Combined,
}

pub struct Saturating {
    table: Box<[u8; SATURATING_TABLE_SIZE]>,
}

impl Saturating {
    fn new() -> Self {
        Self {
            table: Box::new([INITIAL_STATE; SATURATING_TABLE_SIZE]),
        }
    }

    fn index(pc: u32) -> usize {
        pc as usize & (SATURATING_TABLE_SIZE - 1)
    }

    fn predict(&self, pc: u32) -> bool {
        predicts_taken(self.table[Self::index(pc)])
    }

    fn update(&mut self, pc: u32, taken: bool) {
        let idx = Self::index(pc);
        self.table[idx] = transition(self.table[idx], taken);
    }
}

/// `bhr` is fixed at its cold-start value for the life of the predictor; it indexes
/// `table` but is never itself shifted or updated by an observation.
pub struct Bhr {
    bhr: u8,
    table: [u8; BHR_TABLE_SIZE],
}

impl Bhr {
    fn new() -> Self {
        Self {
            bhr: INITIAL_STATE,
            table: [INITIAL_STATE; BHR_TABLE_SIZE],
        }
    }

    fn predict(&self, _pc: u32) -> bool {
        predicts_taken(self.table[self.bhr as usize])
    }

    fn update(&mut self, _pc: u32, taken: bool) {
        let idx = self.bhr as usize;
        self.table[idx] = transition(self.table[idx], taken);
    }
}

/// Maintains a BHR table and a PC table purely as auxiliary bookkeeping; the actual
/// prediction comes from a third table indexed by `XOR(bhr << 14, pc_table[pc] << 2)`.
/// As in [`Bhr`], `bhr` itself is fixed at its cold-start value for the life of the
/// predictor.
pub struct Combined {
    bhr: u8,
    bhr_table: [u8; BHR_TABLE_SIZE],
    pc_table: Box<[u8; SATURATING_TABLE_SIZE]>,
    combined_table: Box<[u8; COMBINED_TABLE_SIZE]>,
}

impl Combined {
    fn new() -> Self {
        Self {
            bhr: INITIAL_STATE,
            bhr_table: [INITIAL_STATE; BHR_TABLE_SIZE],
            pc_table: Box::new([INITIAL_STATE; SATURATING_TABLE_SIZE]),
            combined_table: Box::new([INITIAL_STATE; COMBINED_TABLE_SIZE]),
        }
    }

    fn pc_index(pc: u32) -> usize {
        pc as usize & (SATURATING_TABLE_SIZE - 1)
    }

    fn combined_index(&self, pc: u32) -> usize {
        let pc_value = self.pc_table[Self::pc_index(pc)] as usize;
        ((self.bhr as usize) << 14) ^ (pc_value << 2)
    }

    fn predict(&self, pc: u32) -> bool {
        predicts_taken(self.combined_table[self.combined_index(pc)])
    }

    fn update(&mut self, pc: u32, taken: bool) {
        let pc_idx = Self::pc_index(pc);
        let combined_idx = self.combined_index(pc);

        let bhr_idx = self.bhr as usize;
        self.bhr_table[bhr_idx] = transition(self.bhr_table[bhr_idx], taken);
        self.pc_table[pc_idx] = transition(self.pc_table[pc_idx], taken);
        self.combined_table[combined_idx] = transition(self.combined_table[combined_idx], taken);
    }
}

pub enum Predictor {
    Saturating(Saturating),
    Bhr(Bhr),
    Combined(Combined),
}

impl Predictor {
    pub fn new(kind: PredictorKind) -> Self {
        match kind {
            PredictorKind::Saturating => Predictor::Saturating(Saturating::new()),
            PredictorKind::Bhr => Predictor::Bhr(Bhr::new()),
            PredictorKind::Combined => Predictor::Combined(Combined::new()),
        }
    }

    pub fn predict(&self, pc: u32) -> bool {
        match self {
            Predictor::Saturating(p) => p.predict(pc),
            Predictor::Bhr(p) => p.predict(pc),
            Predictor::Combined(p) => p.predict(pc),
        }
    }

    pub fn update(&mut self, pc: u32, taken: bool) {
        match self {
            Predictor::Saturating(p) => p.update(pc, taken),
            Predictor::Bhr(p) => p.update(pc, taken),
            Predictor::Combined(p) => p.update(pc, taken),
        }
    }
}
