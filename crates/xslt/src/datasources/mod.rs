pub mod xml;

pub use xml::{SpaceRules, XmlNode};
