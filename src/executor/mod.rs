mod descriptor;
mod models;
mod normalize;
#[cfg(feature = "cli")]
mod printer;
mod runner;
mod writer;

pub use models::{
    Attachment, ExchangeRecord, FileRecord, Query, RedirectRecord, RequestBody, RequestRecord,
    ResponseRecord, SentRequest, Verb,
};
pub use normalize::{map_exchange, ReceivedResponse};
#[cfg(feature = "cli")]
pub use printer::print_exchange;
pub use runner::RequestExecutor;
