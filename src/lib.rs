pub mod ast;
pub mod collection;
pub mod config;
pub mod dialect;
pub mod lexer;
pub mod sql;
pub mod sqm;

pub use collection::{
    CollectionError, CollectionEvent, CollectionKey, CollectionLoader, LazyCollection, SessionId,
    TransactionOutcome,
};
pub use config::{ConfigError, DialectSettings};
pub use dialect::capability::{Capability, Gate};
pub use dialect::column_types::SqlType;
pub use dialect::version::DatabaseVersion;
pub use dialect::{Dialect, DialectBuilder, DialectCell, DialectResolutionInfo, Product};
pub use lexer::{tokenize, Lexer, Span, Token, TokenKind};
pub use sql::{DialectError, DialectResult, SqlRendering};
pub use sqm::SqmStatement;
