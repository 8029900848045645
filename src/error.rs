use std::fmt;

#[derive(Debug)]
pub enum PatternboxError {
    Song(SongError),
    Render(RenderError),
}

/// Song description validation errors, raised before any audio is produced.
#[derive(Debug)]
pub enum SongError {
    ZeroRowLen,
    ZeroPatternLen,
    NoChannels,
    ChannelCountMismatch {
        declared: usize,
        actual: usize,
    },
    PatternOutOfRange {
        channel: usize,
        position: usize,
        pattern: usize,
        available: usize,
    },
    InvalidJson(serde_json::Error),
}

/// Renderer state-misuse errors.
#[derive(Debug)]
pub enum RenderError {
    NotComplete { channels_done: usize, channels_total: usize },
}

impl fmt::Display for PatternboxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatternboxError::Song(e) => write!(f, "Song error: {e}"),
            PatternboxError::Render(e) => write!(f, "Render error: {e}"),
        }
    }
}

impl std::error::Error for PatternboxError {}

impl fmt::Display for SongError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SongError::ZeroRowLen => write!(f, "row_len must be nonzero"),
            SongError::ZeroPatternLen => write!(f, "pattern_len must be nonzero"),
            SongError::NoChannels => write!(f, "song has no channels"),
            SongError::ChannelCountMismatch { declared, actual } => {
                write!(f, "num_channels is {declared} but song has {actual} channels")
            }
            SongError::PatternOutOfRange { channel, position, pattern, available } => {
                write!(
                    f,
                    "channel {channel} sequence position {position} references pattern {pattern}, \
                     but only {available} patterns exist"
                )
            }
            SongError::InvalidJson(e) => write!(f, "invalid song JSON: {e}"),
        }
    }
}

impl std::error::Error for SongError {}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::NotComplete { channels_done, channels_total } => {
                write!(
                    f,
                    "render is not complete ({channels_done}/{channels_total} channels synthesized)"
                )
            }
        }
    }
}

impl std::error::Error for RenderError {}

impl From<SongError> for PatternboxError {
    fn from(e: SongError) -> Self {
        PatternboxError::Song(e)
    }
}

impl From<RenderError> for PatternboxError {
    fn from(e: RenderError) -> Self {
        PatternboxError::Render(e)
    }
}

impl From<serde_json::Error> for SongError {
    fn from(e: serde_json::Error) -> Self {
        SongError::InvalidJson(e)
    }
}
