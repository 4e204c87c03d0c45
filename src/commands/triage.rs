use std::io::Write;

use anyhow::Result;

use super::{print_tree, UNRESOLVED_UNASSIGNED};
use crate::client::Client;
use crate::transport::Transport;

pub fn run<T: Transport>(client: &Client<T>, out: &mut impl Write) -> Result<()> {
    print_tree(client, out, UNRESOLVED_UNASSIGNED)
}
