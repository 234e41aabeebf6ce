// Store Tests Module - Testing the public store module
// Tests organized by store module structure:
// - message_tests: Message, Sender and DeliveryStatus
// - chat_log_tests: ChatLog struct
// - state_tests: ChatStore reconciliation

mod message_tests;
