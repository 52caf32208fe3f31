/// Last known cumulative score of one game.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScoreState {
    pub home: i64,
    pub away: i64,
}

impl ScoreState {
    /// Forward-fills the reported scores over this state and returns the
    /// points the action added. Downward corrections count as zero.
    pub fn advance(&mut self, home: Option<i64>, away: Option<i64>) -> u32 {
        let next = ScoreState {
            home: home.unwrap_or(self.home),
            away: away.unwrap_or(self.away),
        };
        let delta = (next.home - self.home) + (next.away - self.away);
        *self = next;
        u32::try_from(delta).unwrap_or(0)
    }
}
