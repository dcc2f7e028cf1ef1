use actix_web::{HttpResponse, Responder, get, post, web};
use log::{error, warn};

use super::models::{AppState, ChainResponse, NewBlockRequest, ValidateResponse, ViewResponse};
use crate::blockchain::{Blockchain, render};
use crate::error::LedgerError;

/// Get the full blockchain.
#[get("/chain/")]
pub async fn get_chain(state: web::Data<AppState>) -> impl Responder {
    let bc = Blockchain::from_blocks(state.ledger.load_for_display());
    HttpResponse::Ok().json(ChainResponse {
        length: bc.len(),
        difficulty: bc.difficulty(),
        chain: bc.into_blocks(),
    })
}

/// Human-readable listing, one line per block.
#[get("/chain/view/")]
pub async fn view_chain(state: web::Data<AppState>) -> impl Responder {
    let chain = state.ledger.load_for_display();
    HttpResponse::Ok().json(ViewResponse {
        lines: render(&chain),
    })
}

/// Validate the whole chain.
#[get("/validate/")]
pub async fn validate_chain(state: web::Data<AppState>) -> impl Responder {
    let report = state.ledger.validate();
    if let Some(f) = &report.fault {
        warn!("VALIDATE - chain rejected: {f}");
    }
    HttpResponse::Ok().json(ValidateResponse {
        valid: report.fault.is_none(),
        length: report.length,
        difficulty: report.difficulty,
        fault: report.fault.map(|f| f.to_string()),
    })
}

/// Append an authored block. Author and data are taken as-is.
#[post("/blocks/")]
pub async fn append_block(
    state: web::Data<AppState>,
    body: web::Json<NewBlockRequest>,
) -> impl Responder {
    let NewBlockRequest { author, data } = body.into_inner();
    let worker = state.clone();

    let result = web::block(move || {
        let _guard = worker.write_lock.lock().expect("mutex poisoned");
        worker.ledger.append_authored(author, data)
    })
    .await;

    match result {
        Ok(Ok(block)) => HttpResponse::Ok().json(block),
        Ok(Err(e @ LedgerError::Chain(_))) => {
            warn!("POST /blocks/ - {e}");
            HttpResponse::Conflict().body(e.to_string())
        }
        Ok(Err(e)) => {
            error!("POST /blocks/ - {e}");
            HttpResponse::InternalServerError().body(e.to_string())
        }
        Err(e) => {
            error!("POST /blocks/ - worker failed: {e}");
            HttpResponse::InternalServerError().body("ledger worker failed")
        }
    }
}
