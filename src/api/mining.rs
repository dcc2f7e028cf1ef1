use std::sync::atomic::Ordering;

use actix_web::{HttpResponse, Responder, post, web};
use log::{error, info, warn};

use super::models::{AppState, CancelResponse, MineResponse};
use crate::error::LedgerError;

/// Mine the next block on the blocking pool. The search has no attempt cap;
/// `/mine/cancel/` stops it at the next progress batch.
#[post("/mine/")]
pub async fn mine_block(state: web::Data<AppState>) -> impl Responder {
    let worker = state.clone();

    let result = web::block(move || {
        let _guard = worker.write_lock.lock().expect("mutex poisoned");
        worker.cancel.reset();
        worker.searching.store(true, Ordering::SeqCst);
        let outcome = worker.ledger.mine(&worker.cancel, |_| {});
        worker.searching.store(false, Ordering::SeqCst);
        outcome
    })
    .await;

    match result {
        Ok(Ok(outcome)) => HttpResponse::Ok().json(MineResponse::from(outcome)),
        Ok(Err(e @ LedgerError::Chain(_))) => {
            warn!("POST /mine/ - {e}");
            HttpResponse::Conflict().body(e.to_string())
        }
        Ok(Err(e)) => {
            error!("POST /mine/ - {e}");
            HttpResponse::InternalServerError().body(e.to_string())
        }
        Err(e) => {
            error!("POST /mine/ - worker failed: {e}");
            HttpResponse::InternalServerError().body("mining worker failed")
        }
    }
}

/// Ask a running search to stop. Reports whether one was running.
#[post("/mine/cancel/")]
pub async fn cancel_mining(state: web::Data<AppState>) -> impl Responder {
    let running = state.searching.load(Ordering::SeqCst);
    if running {
        state.cancel.cancel();
        info!("MINER - cancellation requested");
    }
    HttpResponse::Ok().json(CancelResponse { cancelled: running })
}
