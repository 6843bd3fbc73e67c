//! # luactl - universal-addon tooling
//!
//! `luactl sync` copies the variables of a nested addon module up to the root module that wraps
//! it, so users of the root module can override every addon input.
//!
//! ## Introduction for developers
//!
//! Read this to understand how `luactl` works internally.
//!
//! ### Layout of an addon
//!
//! ```text
//! .terraform/modules/                  <- SyncConfig::modules_dir
//!   addon-x/modules/addon-x/
//!     variables.tf                     <- declarations of the nested module
//! addon-x.tf                           <- consumer: `module` block wiring the nested module
//! variables-addon-x.tf                 <- generated root variables
//! ```
//!
//! ### Loading files
//!
//! Files are parsed with [hcl_edit] into a [document::Document]. `hcl_edit` keeps every byte of
//! the source around (whitespace, comments, number formatting), so a document that is written back
//! without changes is identical to what was read.
//!
//! ### Declarations
//!
//! see [declaration::extract_blocks]
//!
//! Each `variable "<name>" {}` block becomes a [declaration::Declaration]. Blocks without a name
//! are dropped. The order of declarations is the order in the file and stays that way all the way
//! to the generated output so reruns produce minimal diffs.
//!
//! ### Rewriting the consumer
//!
//! see [rewrite::LookupRewriter]
//!
//! Only with [sync::Mode::RewriteConsumer]. Attributes of `module` blocks that call `try` or
//! `lookup` are replaced with a conditional that prefers the root variable and otherwise looks the
//! value up in `local.addon`, using the addon default as last resort:
//!
//! ```hcl
//! module "addon-x" {
//!   size = var.size != null ? var.size : lookup(local.addon, "size", "10")
//! }
//! ```
//!
//! To find those calls the attribute value is converted into an [hcl::Expression] and walked with
//! [visit::VisitFuncCalls]. Everything that does not match is left untouched.
//!
//! ### Root variables
//!
//! see [synthesize::synthesize_root_variables]
//!
//! | **source**                          | **root**                                             |
//! |-------------------------------------|------------------------------------------------------|
//! | `variable "enabled"`                | omitted                                              |
//! | `type = string`                     | `type = string`                                      |
//! | `default = "10"`                    | `default = null`                                     |
//! | `description = "Size of thing"`     | `description = "Size of thing Defaults to `10`."`    |
//!
//! The blocks are built with [hcl::Block::builder], formatted by [hcl::format] and written below a
//! fixed banner ([synthesize::BANNER]).
//!
//! ### Running a sync
//!
//! [sync::Processor::process_modules] walks the modules directory in name order. Failing modules
//! are counted and reported at the end, a fired [context::Context] aborts the run.
//!
pub mod context;
pub mod declaration;
pub mod document;
pub mod rewrite;
pub mod synthesize;
pub mod sync;
mod visit;
