/// Control state of a job table slot.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum JobState {
    #[default]
    Undefined,
    Foreground,
    Background,
    Stopped,
}

impl std::fmt::Display for JobState {
    fn fmt(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            JobState::Undefined => formatter.write_str("Undefined"),
            JobState::Foreground => formatter.write_str("Foreground"),
            JobState::Background => formatter.write_str("Running"),
            JobState::Stopped => formatter.write_str("Stopped"),
        }
    }
}
