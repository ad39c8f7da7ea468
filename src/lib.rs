//! Fichario is the data capture and export core of a clinical-study (veterinary
//! trial) record system: structured records are entered per form type, drafts are
//! kept in sync with the study protocol backend and with a local fallback cache,
//! and every form can be exported as a paginated PDF replicating the fixed layout
//! of the official paper form, down to its ruled table, checkboxes and signature
//! lines.
//!
//! The crate splits into two halves. The rendering half (`template`, `layout`,
//! `fonts`, `pdf`, `renderer`) is a pure transformation: an ordered record list
//! plus the static document metadata go in, deterministic PDF bytes come out. The
//! session half (`session`, `remote`, `cache`, `address`) holds the in-memory
//! editing state of one form and talks to the external collaborators.

/// The scalar field values, the immutable `FormRecord` row type and the static
/// `DocumentMetadata` stamped on every exported page.
pub mod record;

/// The JSON-described layout of one form type: columns, widths, rows per page,
/// page orientation and the padding policy. The ~30 concrete forms of the study
/// are instances of this one shape.
pub mod template;

/// The pure layouting arithmetic: partitioning the record list into pages ahead
/// of any rendering, and word-wrapping cell text through the `TextMeasure` seam.
pub mod layout;

/// The built-in Type1 fonts and their AFM width tables, used both for measuring
/// during layout and for the font resources of the exported document.
pub mod fonts;

/// The low-level `PdfDocument` interface on top of `lopdf`: pages measured in
/// millimeters, text placement and the line, rectangle and checkbox primitives
/// the form grids are drawn with.
pub mod pdf;

/// The document renderer: one pass over the precomputed page partition, emitting
/// per page the metadata header with its running page indicator, the repeated
/// column header row, the body rows in input order and the signature footer.
pub mod renderer;

/// This module contains the `ContextError` type which is the error type used
/// throughout this library.
///
/// The `ContextError` type is always returned from a `Result` type, which means
/// that the end user can expect to obtain an explanation whenever a function
/// returns an error, including the propagated source error when one exists.
pub mod error;

/// The form session: in-memory add/remove/update operations over the record list,
/// draft persistence to the local cache on every change, and the remote-first,
/// cache-fallback load chain.
pub mod session;

/// The client for the study protocol backend, behind the `RemoteStore` trait.
pub mod remote;

/// The file-backed local cache collaborator used as the offline fallback store.
pub mod cache;

/// The postal code lookup collaborator used to prefill address sub-forms.
pub mod address;

/// Environment-driven configuration for the backend URL, the credentials, the
/// lookup service and the cache location.
pub mod config;
