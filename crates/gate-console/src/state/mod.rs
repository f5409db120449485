mod snapshot;
mod store;

pub(crate) use snapshot::RaceSnapshot;
pub(crate) use store::RaceStateStore;

#[cfg(test)]
pub(crate) use store::fold;
