pub mod award;
pub mod bits;
pub mod credit;
pub mod diff;
pub mod error;
pub mod identity;
pub mod member;
pub mod record;
pub mod row;
pub mod snapshot;
pub mod source;
pub mod sourced;

pub use award::{AwardCategory, AwardDelta, AwardState};
pub use bits::BitSeq;
pub use credit::{CreditDelta, CreditState};
pub use error::{CodecError, FetchError, RosterError, StoreError};
pub use identity::Identity;
pub use member::{BOOTSTRAP_MAX_ATTEMPTS, Member};
pub use record::{ChangeRecord, MemberSummary, PRIVATE_PLACEHOLDER};
pub use row::{CreditRow, MemberPatch, MemberRow};
pub use snapshot::{AwardSnapshot, CreditSnapshot, ItemInfo, Profile, Snapshot};
pub use source::{RemoteSource, RowStore};
pub use sourced::Sourced;
