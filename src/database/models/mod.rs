pub mod story;
pub mod user;

pub use story::{NewStory, Story, StoryChanges, StoryResource, StoryWithOwner};
pub use user::User;
