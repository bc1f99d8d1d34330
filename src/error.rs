use thiserror::Error;

/// Errors raised while composing bars from the underlying time-series store.
#[derive(Error, Debug)]
pub enum BarSourceError {
    #[error("underlying time-series query failed: {0}")]
    Query(String),

    #[error("timeframe string '{0}' is not a valid timeframe")]
    InvalidTimeframe(String),

    #[error("symbol {0} has no RTH profile configured")]
    UnknownRthProfile(u32),

    #[error("symbol {0} has no tick value multiplier configured")]
    UnknownTickMultiplier(u32),
}

/// Errors raised while matching orders against a bar stream.
#[derive(Error, Debug)]
pub enum MatchingError {
    #[error("order {0} has non-positive quantity")]
    NonPositiveQuantity(u64),

    #[error("position list for account {account}, symbol {symbol} mixes directions")]
    MixedDirection { account: u64, symbol: u32 },

    #[error("symbol {0} has no tick value multiplier configured")]
    UnknownSymbol(u32),

    #[error("repository interaction failed")]
    Repository(#[from] RepositoryError),
}

/// Errors raised by the replay controller.
#[derive(Error, Debug)]
pub enum ReplayError {
    #[error("play command rejected: {0}")]
    InvalidPlayCommand(String),

    #[error("command channel closed")]
    ChannelClosed,

    #[error("underlying bar source failed")]
    BarSource(#[from] BarSourceError),
}

/// Errors raised interacting with persisted accounts, orders, and positions.
#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("account {0} not found")]
    AccountNotFound(u64),

    #[error("account {account} does not belong to user {user}")]
    NotOwner { account: u64, user: u64 },

    #[error("order {0} not found")]
    OrderNotFound(u64),
}

/// Errors raised while reconstructing trades from fulfilled orders.
#[derive(Error, Debug)]
pub enum TradeError {
    #[error("repository interaction failed")]
    Repository(#[from] RepositoryError),
}

/// Top-level error type unifying every component's error family.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("bar source error")]
    BarSource(#[from] BarSourceError),

    #[error("matching error")]
    Matching(#[from] MatchingError),

    #[error("replay error")]
    Replay(#[from] ReplayError),

    #[error("repository error")]
    Repository(#[from] RepositoryError),

    #[error("trade reconstruction error")]
    Trade(#[from] TradeError),
}
