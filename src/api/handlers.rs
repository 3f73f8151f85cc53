use actix_web::{web, HttpResponse, Responder};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::ledger::node::NodeError;
use crate::ledger::validation::ValidationError;
use crate::ledger::{crypto, LedgerEntry, Node};

/// Shared node handle for the handlers
pub type NodeData = web::Data<Node>;

/// Response for the blockchain endpoint
#[derive(Serialize, Deserialize, ToSchema)]
pub struct ChainResponse {
    /// The number of committed entries
    pub length: usize,

    /// The committed entries, in commit order
    pub chain: Vec<LedgerEntry>,
}

/// Response for the mempool endpoint
#[derive(Serialize, Deserialize, ToSchema)]
pub struct MempoolResponse {
    /// The number of pending entries
    pub length: usize,

    /// The pending entries, in creation order
    pub mempool: Vec<LedgerEntry>,
}

/// Request for the create transaction endpoint
#[derive(Serialize, Deserialize, ToSchema)]
pub struct CreateTransactionRequest {
    /// The sender's address
    pub sender: String,

    /// The receiver's address
    pub receiver: String,

    /// The amount to transfer; zero takes the mint path
    pub amount: f64,

    /// Base58 private key; when present the entry is signed and verified
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private_key: Option<String>,
}

/// Response carrying a single ledger entry
#[derive(Serialize, Deserialize, ToSchema)]
pub struct EntryResponse {
    /// The message
    pub message: String,

    /// The affected entry
    pub tx: LedgerEntry,
}

/// Request for the advance-to-B endpoint
#[derive(Serialize, Deserialize, ToSchema)]
pub struct AdvanceBRequest {
    /// Mempool index of the entry performing the validation
    pub my_index: usize,

    /// Mempool index of the entry being validated
    pub target_index: usize,
}

/// Request for the advance-to-C endpoint
#[derive(Serialize, Deserialize, ToSchema)]
pub struct AdvanceCRequest {
    /// Mempool index of the entry being finalized
    pub target_index: usize,

    /// Address credited as the validator
    pub validator: String,
}

/// Response for the balance endpoint
#[derive(Serialize, Deserialize, ToSchema)]
pub struct BalanceResponse {
    /// The queried address
    pub address: String,

    /// The derived balance
    pub balance: f64,
}

/// Maps a node error onto an HTTP response with a JSON error body.
fn error_response(err: NodeError) -> HttpResponse {
    let body = serde_json::json!({ "error": err.to_string() });

    match err {
        NodeError::UnknownEntry(_) => HttpResponse::NotFound().json(body),
        NodeError::Validation(ValidationError::InvalidStateTransition { .. }) => {
            HttpResponse::Conflict().json(body)
        }
        NodeError::Validation(ValidationError::ProofOfWorkTimeout) => {
            HttpResponse::ServiceUnavailable().json(body)
        }
        _ => HttpResponse::BadRequest().json(body),
    }
}

/// Get the full ledger
///
/// Returns every committed entry in commit order
#[utoipa::path(
    get,
    path = "/api/v1/blockchain",
    responses(
        (status = 200, description = "Ledger retrieved successfully", body = ChainResponse)
    )
)]
pub async fn get_blockchain(node: NodeData) -> impl Responder {
    let chain = node.get_blockchain();

    HttpResponse::Ok().json(ChainResponse {
        length: chain.len(),
        chain,
    })
}

/// Get the pending set
///
/// Returns every pending entry in creation order
#[utoipa::path(
    get,
    path = "/api/v1/mempool",
    responses(
        (status = 200, description = "Mempool retrieved successfully", body = MempoolResponse)
    )
)]
pub async fn get_mempool(node: NodeData) -> impl Responder {
    let mempool = node.get_mempool();

    HttpResponse::Ok().json(MempoolResponse {
        length: mempool.len(),
        mempool,
    })
}

/// Generate a keypair
///
/// Returns a fresh secp256k1 keypair, base58 encoded
#[utoipa::path(
    get,
    path = "/api/v1/generate_keypair",
    responses(
        (status = 200, description = "Keypair generated successfully", body = crypto::Keypair)
    )
)]
pub async fn generate_keypair() -> impl Responder {
    HttpResponse::Ok().json(crypto::generate_keypair())
}

/// Get an address balance
///
/// Derives the balance by replaying the committed ledger
#[utoipa::path(
    get,
    path = "/api/v1/balance/{address}",
    responses(
        (status = 200, description = "Balance retrieved successfully", body = BalanceResponse)
    )
)]
pub async fn get_balance(node: NodeData, address: web::Path<String>) -> impl Responder {
    let address = address.into_inner();
    let balance = node.balance(&address);

    HttpResponse::Ok().json(BalanceResponse { address, balance })
}

/// Create a new transaction
///
/// Builds a State-A entry and appends it to the mempool
#[utoipa::path(
    post,
    path = "/api/v1/create_transaction",
    request_body = CreateTransactionRequest,
    responses(
        (status = 201, description = "State A entry created", body = EntryResponse),
        (status = 400, description = "Invalid transaction data")
    )
)]
pub async fn create_transaction(
    node: NodeData,
    req: web::Json<CreateTransactionRequest>,
) -> impl Responder {
    let result = match &req.private_key {
        Some(key) => node.create_signed_transaction(&req.sender, &req.receiver, req.amount, key),
        None => node.create_transaction(&req.sender, &req.receiver, req.amount),
    };

    match result {
        Ok(tx) => HttpResponse::Created().json(EntryResponse {
            message: "State A created".to_string(),
            tx,
        }),
        Err(err) => error_response(err),
    }
}

/// Advance an entry to State B
///
/// Cross-validates the target entry and embeds the proof into the caller's entry
#[utoipa::path(
    post,
    path = "/api/v1/advance_b",
    request_body = AdvanceBRequest,
    responses(
        (status = 200, description = "Entry advanced to State B", body = EntryResponse),
        (status = 404, description = "Unknown mempool index"),
        (status = 409, description = "Entry not in the required state")
    )
)]
pub async fn advance_b(node: NodeData, req: web::Json<AdvanceBRequest>) -> impl Responder {
    match node.advance_b(req.my_index, req.target_index) {
        Ok(tx) => HttpResponse::Ok().json(EntryResponse {
            message: "Advanced to B".to_string(),
            tx,
        }),
        Err(err) => error_response(err),
    }
}

/// Finalize an entry to State C
///
/// Mines the final proof, records the validator, and commits the entry
#[utoipa::path(
    post,
    path = "/api/v1/advance_c",
    request_body = AdvanceCRequest,
    responses(
        (status = 200, description = "Entry finalized and committed", body = EntryResponse),
        (status = 404, description = "Unknown mempool index"),
        (status = 409, description = "Entry not in the required state"),
        (status = 503, description = "Proof-of-work search timed out")
    )
)]
pub async fn advance_c(node: NodeData, req: web::Json<AdvanceCRequest>) -> impl Responder {
    match node.advance_c(req.target_index, &req.validator) {
        Ok(tx) => HttpResponse::Ok().json(EntryResponse {
            message: "Moved to blockchain".to_string(),
            tx,
        }),
        Err(err) => error_response(err),
    }
}
