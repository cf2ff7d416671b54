mod membership_store;

pub use membership_store::MembershipStore;
