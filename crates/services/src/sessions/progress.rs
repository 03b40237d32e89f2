/// Where a practice run currently stands, for progress displays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionProgress {
    pub total: usize,
    pub answered: usize,
    pub correct: u32,
    pub remaining: usize,
    pub is_complete: bool,
}
