use std::sync::Arc;

use async_graphql::dynamic::{Subscription, SubscriptionField, SubscriptionFieldFuture, TypeRef};
use futures::StreamExt;

use super::SchemaOptions;
use super::types::TableTypes;
use super::utils::{executor, rows_value};
use crate::feed::ChangeFeed;

/// Adds the subscription field of one table, if it has a primary key.
pub(super) fn subscription_field(
	tt: &Arc<TableTypes>,
	options: &SchemaOptions,
	subscription: Subscription,
) -> Subscription {
	if tt.pk().is_none() {
		return subscription;
	}
	let tb_name = tt.name();
	let tt1 = tt.clone();
	let interval = options.poll_interval;
	let from_tail = options.feed_from_tail;
	subscription.field(
		SubscriptionField::new(tb_name, TypeRef::named_nn_list_nn(&tt.object), move |ctx| {
			let tt = tt1.clone();
			SubscriptionFieldFuture::new(async move {
				let exe = executor(&ctx)?;
				let feed = ChangeFeed::new(exe, (*tt.table).clone())?
					.with_interval(interval)
					.from_tail(from_tail);
				debug!("Starting change feed on table `{}`", tt.name());
				let stream = feed.into_stream().map(|res| match res {
					Ok(rows) => Ok(rows_value(rows)),
					Err(e) => Err(async_graphql::Error::new(e.to_string())),
				});
				Ok(stream)
			})
		})
		.description(format!(
			"Generated from table `{tb_name}`\nemits each batch of newly inserted rows"
		)),
	)
}
