#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Latch weight must be positive: {}", weight)]
    ZeroLatchWeight { weight: u32 },

    #[error("Thread pool size must be positive: {}", threads)]
    ZeroPoolSize { threads: usize },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
