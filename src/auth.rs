//! Auth-domain identifiers, scope sets, scope resolution, and token models.

pub mod id;
pub mod resolver;
pub mod scope;
pub mod token;

pub use id::*;
pub use resolver::*;
pub use scope::*;
pub use token::{record::*, secret::*};
