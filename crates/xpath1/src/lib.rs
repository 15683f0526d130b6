pub mod ast;
pub mod axes;
pub mod datasource;
pub mod engine;
pub mod error;
pub mod functions;
pub mod namespaces;
pub mod operators;
pub mod parser;

pub use ast::{Axis, BinaryOperator, Expression, LocationPath, NameTest, NodeTest, Step};
pub use datasource::{DataSourceNode, NodeType, QName};
pub use engine::{EvaluationContext, XPathValue, evaluate, format_number};
pub use namespaces::bind_namespaces;

// Mock tree for tests in this crate and in downstream crates
pub use datasource::tests;
pub use error::XPathError;
pub use parser::parse_expression;
