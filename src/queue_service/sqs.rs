use async_trait::async_trait;
use aws_sdk_sqs::error::DisplayErrorContext;
use aws_sdk_sqs::types::Message;
use tracing::warn;

use super::{QueueAddress, QueueService, ReceivedMessage};
use crate::errors::QueueServiceError;

#[async_trait]
impl QueueService for aws_sdk_sqs::Client {
    async fn resolve_queue(&self, queue_name: &str) -> Result<QueueAddress, QueueServiceError> {
        let output = self
            .get_queue_url()
            .queue_name(queue_name)
            .send()
            .await
            .map_err(|e| QueueServiceError::request("GetQueueUrl", DisplayErrorContext(e)))?;

        output.queue_url.map(QueueAddress::from).ok_or_else(|| {
            QueueServiceError::MalformedResponse(format!(
                "GetQueueUrl returned no URL for queue `{queue_name}`"
            ))
        })
    }

    async fn receive_messages(
        &self,
        queue: &QueueAddress,
        max_messages: i32,
        wait_time_seconds: i32,
    ) -> Result<Vec<ReceivedMessage>, QueueServiceError> {
        let output = self
            .receive_message()
            .queue_url(queue.as_str())
            .max_number_of_messages(max_messages)
            .wait_time_seconds(wait_time_seconds)
            .send()
            .await
            .map_err(|e| QueueServiceError::request("ReceiveMessage", DisplayErrorContext(e)))?;

        Ok(output
            .messages
            .unwrap_or_default()
            .into_iter()
            .filter_map(|message| into_received_message(queue, message))
            .collect())
    }

    async fn delete_message(
        &self,
        queue: &QueueAddress,
        receipt_token: &str,
    ) -> Result<(), QueueServiceError> {
        self.delete_message()
            .queue_url(queue.as_str())
            .receipt_handle(receipt_token)
            .send()
            .await
            .map_err(|e| QueueServiceError::request("DeleteMessage", DisplayErrorContext(e)))?;
        Ok(())
    }
}

fn into_received_message(queue: &QueueAddress, message: Message) -> Option<ReceivedMessage> {
    let id = message.message_id.unwrap_or_else(|| "unknown".to_string());

    // Without a receipt handle the delivery can never be acknowledged.
    let Some(receipt_token) = message.receipt_handle else {
        warn!(queue_address = %queue, message_id = %id, "Received a message with no receipt handle, skipping");
        return None;
    };

    Some(ReceivedMessage {
        id,
        body: message.body.unwrap_or_default().into_bytes(),
        receipt_token,
    })
}
