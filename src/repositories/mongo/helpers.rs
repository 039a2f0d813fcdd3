use mongodb::bson::{bson, doc, Bson};
use mongodb::error::Result as MongoResult;
use mongodb::options::{Acknowledgment, ReadConcern, TransactionOptions, WriteConcern};
use mongodb::{Client, ClientSession, Collection, Database};
use tracing::Instrument;

use super::converters::{convert_repo_err, to_bool};
use super::Result as RepoResult;
use crate::repositories::RepositoryError;
use crate::utils::LetChain;

pub async fn initialize_coll(
    coll_name: &str,
    db: &Database,
    unique_fields: &[&str],
) -> MongoResult<()> {
    let indexes = unique_fields
        .iter()
        .map(|field| {
            let field = *field;
            bson!({
                "name": format!("unique_{}", field),
                "key": { field: 1 },
                "unique": true
            })
        })
        .collect::<Vec<_>>();

    db.run_command(
        doc! {
            "createIndexes": coll_name,
            "indexes": indexes,
        },
        None,
    )
    .instrument(tracing::trace_span!("run_command"))
    .await?;

    Ok(())
}

pub async fn make_session(c: &Client) -> MongoResult<ClientSession> {
    let mut s = c
        .start_session(None)
        .instrument(tracing::trace_span!("start_session"))
        .await?;

    let ta_opt = TransactionOptions::builder()
        .read_concern(ReadConcern::snapshot())
        .write_concern(WriteConcern::builder().w(Acknowledgment::Majority).build())
        .build();
    s.start_transaction(ta_opt)
        .instrument(tracing::trace_span!("start_transaction"))
        .await?;

    Ok(s)
}

pub async fn process_transaction(s: &mut ClientSession) -> MongoResult<()> {
    loop {
        let r = s
            .commit_transaction()
            .instrument(tracing::trace_span!("commit_transaction"))
            .await;
        if let Err(ref e) = r {
            if e.contains_label(::mongodb::error::UNKNOWN_TRANSACTION_COMMIT_RESULT) {
                continue;
            }
        }

        break r;
    }
}

pub async fn is_contains<T>(
    name: impl AsRef<str>,
    coll: &Collection<T>,
    id: impl Into<Bson>,
    target: impl Into<Bson>,
) -> RepoResult<bool> {
    let name = name.as_ref();
    let id: Bson = id.into();
    let target: Bson = target.into();

    let res = coll
        .count_documents(
            doc! {
                "id": id,
                name: { "$in": [target] }
            },
            None,
        )
        .instrument(tracing::trace_span!("count_documents"))
        .await
        .let_(convert_repo_err)?
        .let_(to_bool);

    Ok(res)
}

#[derive(Clone, Copy)]
pub enum ModifyOpTy {
    Push,
    Pull,
}

/// Add-if-absent / remove-if-present on a set-valued field, as one store
/// operation. `Err(NotFound)` when no document matches `id`; `Ok(false)`
/// when the document matched but the set already was in the target state.
pub async fn modify_set<T>(
    name: impl AsRef<str>,
    coll: &Collection<T>,
    id: impl Into<Bson>,
    target: impl Into<Bson>,
    ty: ModifyOpTy,
) -> RepoResult<bool> {
    let name = name.as_ref();
    let id: Bson = id.into();
    let target: Bson = target.into();

    let operation = match ty {
        ModifyOpTy::Push => "$addToSet",
        ModifyOpTy::Pull => "$pull",
    };

    let res = coll
        .update_one(
            doc! { "id": id },
            doc! { operation: { name: target } },
            None,
        )
        .instrument(tracing::trace_span!("update_one"))
        .await
        .let_(convert_repo_err)?;

    if !res.matched_count.let_(to_bool) {
        return Err(RepositoryError::NotFound);
    }

    Ok(res.modified_count.let_(to_bool))
}

/// Same as [`modify_set`], for the `upvoted_by` set of one embedded course
/// resource. Keeps the denormalized `upvotes` counter in step with the set
/// inside a single transaction; the `$inc` only runs when the set actually
/// changed.
pub async fn modify_upvote_set<T>(
    coll: &Collection<T>,
    client: &Client,
    id: &Bson,
    resource_id: &Bson,
    target: &Bson,
    ty: ModifyOpTy,
) -> RepoResult<bool> {
    async fn transaction<T>(
        coll: &Collection<T>,
        client: &Client,
        id: &Bson,
        resource_id: &Bson,
        target: &Bson,
        ty: ModifyOpTy,
    ) -> MongoResult<Option<bool>> {
        let mut session = make_session(client).await?;

        let filter = doc! { "id": id.clone(), "resources.id": resource_id.clone() };
        let operation = match ty {
            ModifyOpTy::Push => "$addToSet",
            ModifyOpTy::Pull => "$pull",
        };
        let res = coll
            .update_one_with_session(
                filter.clone(),
                doc! { operation: { "resources.$.upvoted_by": target.clone() } },
                None,
                &mut session,
            )
            .instrument(tracing::trace_span!("update_one_with_session"))
            .await?;

        if !res.matched_count.let_(to_bool) {
            return Ok(None);
        }
        if !res.modified_count.let_(to_bool) {
            return Ok(Some(false));
        }

        let inc_value = match ty {
            ModifyOpTy::Push => 1,
            ModifyOpTy::Pull => -1,
        };
        let res = coll
            .update_one_with_session(
                filter,
                doc! { "$inc": { "resources.$.upvotes": inc_value } },
                None,
                &mut session,
            )
            .instrument(tracing::trace_span!("update_one_with_session"))
            .await?;

        if !res.matched_count.let_(to_bool) {
            unreachable!("not found value");
        }

        process_transaction(&mut session).await.map(|_| Some(true))
    }

    let res = loop {
        let r = transaction(coll, client, id, resource_id, target, ty).await;
        if let Err(ref e) = r {
            if e.contains_label(::mongodb::error::TRANSIENT_TRANSACTION_ERROR) {
                continue;
            }
        }

        break r;
    };

    res.let_(convert_repo_err)?.let_(|o| match o {
        Some(b) => Ok(b),
        None => Err(RepositoryError::NotFound),
    })
}
