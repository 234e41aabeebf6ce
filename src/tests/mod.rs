// Test modules for Chatdesk
// Each module covers the public API of the corresponding source module

mod store_tests;
