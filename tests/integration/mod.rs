mod api_client;
mod chat_session;
