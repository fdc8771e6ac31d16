pub mod user;
pub mod event;
pub mod envelope;

pub use user::{DashboardStats, User, UserProfile};
pub use event::{
    Category, Coordinates, Event, EventChanges, EventView, Location, NewEvent, OrganizerSummary,
};
pub use envelope::{AuthData, Envelope, EventData, EventListData, SaveData, StatsData, UserData};
