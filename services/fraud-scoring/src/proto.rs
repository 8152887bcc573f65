//! Messages and client for `user.UserTransactionsService`, generated from
//! `proto/user_transactions.proto` at build time.

tonic::include_proto!("user");
