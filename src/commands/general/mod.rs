pub(crate) mod help;
pub(crate) mod register;

use crate::{CommandResult, Context, Data, Error};

pub fn commands() -> Vec<poise::Command<Data, Error>> {
    vec![help::help(), register::register()]
}
