//! Thread-safe parser pool for tree-sitter parsers
//!
//! Tree-sitter parsers are not `Sync`, so each worker thread owns one parser
//! and requests are handed out over a shared channel. Callers block until
//! their tree comes back, which lets any number of extraction threads share a
//! fixed number of parsers.

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};

use arbor_core::DocumentId;
use tree_sitter::Parser;

use crate::extractor::ExtractError;

/// A parsing request sent to the parser pool
#[derive(Debug)]
pub struct ParseRequest {
    pub document: DocumentId,
    pub content: String,
}

/// Result of a parsing operation
#[derive(Debug)]
pub struct ParseResult {
    pub tree: tree_sitter::Tree,
    pub document: DocumentId,
    pub content: String,
}

/// Internal message for the parser worker
struct WorkerRequest {
    request: ParseRequest,
    response_sender: Sender<Result<ParseResult, ExtractError>>,
}

/// Thread-safe pool of Rust parsers
#[derive(Clone)]
pub struct ParserPool {
    sender: Sender<WorkerRequest>,
}

impl ParserPool {
    /// Create a new parser pool with the specified number of worker threads
    pub fn new(num_workers: usize) -> Self {
        let (sender, receiver) = mpsc::channel::<WorkerRequest>();
        let receiver = Arc::new(Mutex::new(receiver));

        for i in 0..num_workers.max(1) {
            let receiver = Arc::clone(&receiver);
            std::thread::spawn(move || {
                Self::worker_thread(i, receiver);
            });
        }

        Self { sender }
    }

    /// Worker thread function that processes parsing requests
    fn worker_thread(worker_id: usize, receiver: Arc<Mutex<Receiver<WorkerRequest>>>) {
        tracing::debug!("Parser worker {} started", worker_id);

        let mut parser = Parser::new();
        let language_ready = parser
            .set_language(&tree_sitter_rust::LANGUAGE.into())
            .map_err(|e| ExtractError::Parser(format!("Failed to set language: {}", e)));

        loop {
            let next = match receiver.lock() {
                Ok(guard) => guard.recv(),
                Err(_) => break,
            };
            let Ok(WorkerRequest {
                request,
                response_sender,
            }) = next
            else {
                tracing::debug!("Parser worker {} shutting down", worker_id);
                break;
            };

            let result = match &language_ready {
                Err(e) => Err(e.clone()),
                Ok(()) => match parser.parse(&request.content, None) {
                    Some(tree) => Ok(ParseResult {
                        tree,
                        document: request.document,
                        content: request.content,
                    }),
                    None => Err(ExtractError::Parser(format!(
                        "Failed to parse {}",
                        request.document
                    ))),
                },
            };

            if response_sender.send(result).is_err() {
                tracing::warn!("Failed to send parse result back to caller");
            }
        }
    }

    /// Parse content, blocking the current thread until the tree is ready.
    pub fn parse_blocking(&self, request: ParseRequest) -> Result<ParseResult, ExtractError> {
        let (response_sender, response_receiver) = mpsc::channel();

        self.sender
            .send(WorkerRequest {
                request,
                response_sender,
            })
            .map_err(|_| ExtractError::Parser("Parser pool is shut down".to_string()))?;

        response_receiver
            .recv()
            .map_err(|_| ExtractError::Parser("Parser worker died".to_string()))?
    }
}

/// Convenience function to create a parser pool with default settings
pub fn create_parser_pool() -> ParserPool {
    // Use number of CPU cores as default worker count, but at least 2
    let num_workers = std::thread::available_parallelism()
        .map(|n| n.get().max(2))
        .unwrap_or(2);

    ParserPool::new(num_workers)
}
