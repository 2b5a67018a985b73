mod messages;
mod pitches;
mod profiles;
mod projects;
mod users;
