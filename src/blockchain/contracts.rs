// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Solidity bindings for the identity and data request registries.

use alloy::sol;

sol! {
    /// Registered subject as returned by `getUser`.
    struct RegisteredUser {
        uint256 userId;
        address userAddress;
        string ipfsHash;
        string publicKey;
        bytes32 dataHash;
    }

    /// Request row as returned by the registry views.
    struct DataRequestEntry {
        uint256 id;
        address requester;
        address subject;
        string[] fields;
        uint8 status;
    }

    #[sol(rpc)]
    interface IIdentityRegistry {
        event UserRegistered(uint256 indexed userId, address indexed userAddress, bytes32 dataHash);
        event RequesterHashSet(address indexed subject, address indexed requester, string ipfsHash);

        function registerUser(bytes32 dataHash, string ipfsHash, string publicKey) external;
        function getUser(address userAddress) external view returns (RegisteredUser memory);
        function checkHashOwner(bytes32 dataHash) external view returns (address);
        function setRequesterIpfsHash(address requester, string ipfsHash) external;
        function getRequesterIpfsHash(address subject, address requester) external view returns (string memory);
    }

    #[sol(rpc)]
    interface IDataRequestRegistry {
        event RequestCreated(uint256 indexed id, address indexed requester, address indexed subject);
        event RequestStatusChanged(uint256 indexed id, uint8 status);

        function createRequest(address subject, string[] fields) external returns (uint256);
        function getRequest(uint256 id) external view returns (DataRequestEntry memory);
        function getDetailedUserRequests(address subject) external view returns (DataRequestEntry[] memory);
        function approveRequest(uint256 id) external;
        function rejectRequest(uint256 id) external;
    }
}
