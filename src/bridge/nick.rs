//! Nick negotiation.
//!
//! Walks the configured nick list whenever the server reports the current
//! nick as taken, wrapping back to the first entry after the last one. There
//! is no terminal state: if every candidate is taken the negotiator keeps
//! cycling.

use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct NickNegotiator {
    nicks: Arc<[String]>,
    cursor: usize,
}

impl NickNegotiator {
    /// `nicks` must be non-empty; config validation guarantees this.
    pub fn new(nicks: Arc<[String]>) -> Self {
        debug_assert!(!nicks.is_empty());
        Self { nicks, cursor: 0 }
    }

    pub fn current(&self) -> &str {
        &self.nicks[self.cursor]
    }

    /// Advance to the next candidate and return it.
    pub fn next_nick(&mut self) -> &str {
        self.cursor = (self.cursor + 1) % self.nicks.len();
        self.current()
    }

    /// Move the cursor to `nick` if it is one of the candidates. Nicks the
    /// server assigned on its own leave the cursor where it was.
    pub fn sync_to(&mut self, nick: &str) -> bool {
        match self.nicks.iter().position(|n| n.eq_ignore_ascii_case(nick)) {
            Some(index) => {
                self.cursor = index;
                true
            }
            None => false,
        }
    }

    /// The candidates after the current one, in the order collisions will
    /// walk them: one full lap of the list, ending back at the current nick.
    /// The IRC client retries registration with these by itself.
    pub fn upcoming(&self) -> Vec<String> {
        let n = self.nicks.len();
        (1..=n)
            .map(|step| self.nicks[(self.cursor + step) % n].clone())
            .collect()
    }
}
